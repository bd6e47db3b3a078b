use std::collections::HashSet;

use crate::catalogue::ModuleCapabilities;
use crate::report;

/// Process-wide, read-only filter sets (spec.md §3 "Filter sets"). Immutable
/// once built, safe to share across categories without synchronisation.
#[derive(Debug, Clone, Default)]
pub struct FilterSets {
    pub allowed_statuses: HashSet<String>,
    pub include_overrides: HashSet<String>,
    pub exclusions: HashSet<String>,
}

impl FilterSets {
    pub fn new(
        allowed_statuses: impl IntoIterator<Item = String>,
        include_overrides: impl IntoIterator<Item = String>,
        exclusions: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            allowed_statuses: allowed_statuses.into_iter().collect(),
            include_overrides: include_overrides.into_iter().collect(),
            exclusions: exclusions.into_iter().collect(),
        }
    }
}

enum Decision {
    KeptAllowedStatus,
    KeptIncludeOverride,
    DroppedExcluded,
    DroppedNotAllowed,
}

/// Exclusion beats inclusion beats status check (spec.md §4.C). Total,
/// stable: preserves order, never duplicates.
fn decide(name: &str, status: &str, sets: &FilterSets) -> Decision {
    if sets.exclusions.contains(name) {
        Decision::DroppedExcluded
    } else if sets.allowed_statuses.contains(status) {
        Decision::KeptAllowedStatus
    } else if sets.include_overrides.contains(name) {
        Decision::KeptIncludeOverride
    } else {
        Decision::DroppedNotAllowed
    }
}

/// Select modules for processing, preserving catalogue order. Every decision
/// is logged with its reason (spec.md §4.C).
pub fn filter_modules<T: ModuleCapabilities>(
    modules: Vec<T>,
    sets: &FilterSets,
    scope: &str,
) -> Vec<T> {
    let mut kept = Vec::with_capacity(modules.len());
    for module in modules {
        let name = module.name().to_string();
        let status = module.status().to_string();
        match decide(&name, &status, sets) {
            Decision::KeptAllowedStatus => {
                report::info(scope, format!("keep {name}: status `{status}` is allowed"));
                kept.push(module);
            }
            Decision::KeptIncludeOverride => {
                report::info(scope, format!("keep {name}: included by override"));
                kept.push(module);
            }
            Decision::DroppedExcluded => {
                report::info(scope, format!("drop {name}: excluded"));
            }
            Decision::DroppedNotAllowed => {
                report::info(
                    scope,
                    format!("drop {name}: status `{status}` is not allowed and not overridden"),
                );
            }
        }
    }
    kept
}
