use once_cell::sync::Lazy;
use regex::Regex;

use crate::catalogue::Category;

static RESOURCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^avm-(res-)(.+)$").unwrap());
static PATTERN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^avm-ptn-(.+)$").unwrap());
static UTILITY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^avm-utl-(.+)$").unwrap());

/// Pure, deterministic rewrite of an upstream module name into the internal
/// naming convention, per spec.md §4.B. Inputs that don't match the
/// category's rule pass through unchanged.
pub fn transform_name(category: Category, name: &str) -> String {
    match category {
        Category::Resource => match RESOURCE_RE.captures(name) {
            Some(caps) => format!("rvm-res-azurerm-{}", &caps[2]),
            None => name.to_string(),
        },
        Category::Pattern => match PATTERN_RE.captures(name) {
            Some(caps) => format!("rvm-pat-azurerm-{}", &caps[1]),
            None => name.to_string(),
        },
        Category::Utility => match UTILITY_RE.captures(name) {
            Some(caps) => format!("rvm-utl-azurerm-{}", &caps[1]),
            None => name.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::Category;

    #[test]
    fn resource_rewrite() {
        assert_eq!(
            transform_name(Category::Resource, "avm-res-storage-account"),
            "rvm-res-azurerm-storage-account"
        );
    }

    #[test]
    fn pattern_rewrite() {
        assert_eq!(
            transform_name(Category::Pattern, "avm-ptn-network-hub"),
            "rvm-pat-azurerm-network-hub"
        );
    }

    #[test]
    fn utility_rewrite() {
        assert_eq!(
            transform_name(Category::Utility, "avm-utl-types"),
            "rvm-utl-azurerm-types"
        );
    }

    #[test]
    fn non_matching_input_passes_through() {
        assert_eq!(
            transform_name(Category::Resource, "some-other-name"),
            "some-other-name"
        );
        assert_eq!(
            transform_name(Category::Pattern, "avm-res-storage-account"),
            "avm-res-storage-account"
        );
    }

    #[test]
    fn idempotent_under_repeated_application() {
        for (category, name) in [
            (Category::Resource, "avm-res-storage-account"),
            (Category::Pattern, "avm-ptn-network-hub"),
            (Category::Utility, "avm-utl-types"),
            (Category::Resource, "unrelated"),
        ] {
            let once = transform_name(category, name);
            let twice = transform_name(category, &once);
            assert_eq!(once, twice, "transform must be idempotent for {name}");
        }
    }
}
