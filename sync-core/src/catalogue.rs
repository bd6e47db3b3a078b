use std::io::Read;
use std::path::Path;

use crate::error::{SyncError, SyncErrorKind, SyncResult};

/// Selects the catalogue source and the name-transformation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Resource,
    Pattern,
    Utility,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Resource => "resource",
            Category::Pattern => "pattern",
            Category::Utility => "utility",
        }
    }

    /// Fixed catalogue URL for this category (spec.md §6 "Catalogue URLs").
    pub fn default_url(&self) -> &'static str {
        match self {
            Category::Resource => "https://catalog.example.com/avm/resource.csv",
            Category::Pattern => "https://catalog.example.com/avm/pattern.csv",
            Category::Utility => "https://catalog.example.com/avm/utility.csv",
        }
    }
}

/// Fields shared by every module record, per spec.md §3 "Module record".
#[derive(Debug, Clone, Default)]
pub struct CommonFields {
    pub module_name: String,
    pub repo_url: String,
    pub module_status: String,
    pub display_name: String,
    pub description: String,
    pub alternative_names: String,
    pub first_published_in: String,
}

/// The capability set every module variant exposes to the engine.
pub trait ModuleCapabilities {
    fn name(&self) -> &str;
    fn repo_url(&self) -> &str;
    fn status(&self) -> &str;
}

macro_rules! impl_capabilities {
    ($ty:ty) => {
        impl ModuleCapabilities for $ty {
            fn name(&self) -> &str {
                &self.common.module_name
            }
            fn repo_url(&self) -> &str {
                &self.common.repo_url
            }
            fn status(&self) -> &str {
                &self.common.module_status
            }
        }
    };
}

#[derive(Debug, Clone, Default)]
pub struct ResourceModule {
    pub common: CommonFields,
    pub provider_namespace: String,
    pub resource_type: String,
    pub parent_module: String,
}
impl_capabilities!(ResourceModule);

#[derive(Debug, Clone, Default)]
pub struct PatternModule {
    pub common: CommonFields,
}
impl_capabilities!(PatternModule);

#[derive(Debug, Clone, Default)]
pub struct UtilityModule {
    pub common: CommonFields,
}
impl_capabilities!(UtilityModule);

/// Where to acquire a catalogue from — gated by the `read-local-csv` flag.
pub enum CatalogueSource<'a> {
    Remote(&'a str),
    Local(&'a Path),
}

fn fetch_bytes(source: &CatalogueSource<'_>) -> SyncResult<Vec<u8>> {
    match source {
        CatalogueSource::Remote(url) => {
            let response = reqwest::blocking::get(*url).map_err(|err| {
                SyncError::new(
                    SyncErrorKind::CatalogueFetchFailed,
                    format!("GET {url} failed: {err}"),
                )
            })?;
            if !response.status().is_success() {
                return Err(SyncError::new(
                    SyncErrorKind::CatalogueFetchFailed,
                    format!("GET {url} returned {}", response.status()),
                ));
            }
            response.bytes().map(|b| b.to_vec()).map_err(|err| {
                SyncError::new(
                    SyncErrorKind::CatalogueFetchFailed,
                    format!("failed reading response body from {url}: {err}"),
                )
            })
        }
        CatalogueSource::Local(path) => {
            let mut file = std::fs::File::open(path).map_err(|err| {
                SyncError::new(
                    SyncErrorKind::CatalogueFetchFailed,
                    format!("opening {}: {err}", path.display()),
                )
            })?;
            let mut buf = Vec::new();
            file.read_to_end(&mut buf).map_err(|err| {
                SyncError::new(
                    SyncErrorKind::CatalogueFetchFailed,
                    format!("reading {}: {err}", path.display()),
                )
            })?;
            Ok(buf)
        }
    }
}

struct Table {
    headers: Vec<String>,
    rows: Vec<csv::StringRecord>,
}

fn read_table(bytes: &[u8]) -> SyncResult<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|err| {
            SyncError::new(
                SyncErrorKind::CatalogueFetchFailed,
                format!("malformed catalogue header row: {err}"),
            )
        })?
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| {
            SyncError::new(
                SyncErrorKind::CatalogueFetchFailed,
                format!("malformed catalogue row: {err}"),
            )
        })?;
        rows.push(record);
    }

    Ok(Table { headers, rows })
}

fn field(table: &Table, record: &csv::StringRecord, name: &str) -> String {
    table
        .headers
        .iter()
        .position(|h| h == name)
        .and_then(|idx| record.get(idx))
        .unwrap_or("")
        .to_string()
}

fn common_fields(table: &Table, record: &csv::StringRecord) -> CommonFields {
    CommonFields {
        module_name: field(table, record, "ModuleName"),
        repo_url: field(table, record, "RepoURL"),
        module_status: field(table, record, "ModuleStatus"),
        display_name: field(table, record, "ModuleDisplayName"),
        description: field(table, record, "Description"),
        alternative_names: field(table, record, "AlternativeNames"),
        first_published_in: field(table, record, "FirstPublishedIn"),
    }
}

pub fn load_resource_catalogue(source: CatalogueSource<'_>) -> SyncResult<Vec<ResourceModule>> {
    let bytes = fetch_bytes(&source)?;
    let table = read_table(&bytes)?;
    let mut out = Vec::with_capacity(table.rows.len());
    for record in &table.rows {
        out.push(ResourceModule {
            common: common_fields(&table, record),
            provider_namespace: field(&table, record, "ProviderNamespace"),
            resource_type: field(&table, record, "ResourceType"),
            parent_module: field(&table, record, "ParentModule"),
        });
    }
    Ok(out)
}

pub fn load_pattern_catalogue(source: CatalogueSource<'_>) -> SyncResult<Vec<PatternModule>> {
    let bytes = fetch_bytes(&source)?;
    let table = read_table(&bytes)?;
    Ok(table
        .rows
        .iter()
        .map(|record| PatternModule {
            common: common_fields(&table, record),
        })
        .collect())
}

pub fn load_utility_catalogue(source: CatalogueSource<'_>) -> SyncResult<Vec<UtilityModule>> {
    let bytes = fetch_bytes(&source)?;
    let table = read_table(&bytes)?;
    Ok(table
        .rows
        .iter()
        .map(|record| UtilityModule {
            common: common_fields(&table, record),
        })
        .collect())
}
