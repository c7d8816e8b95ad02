//! Loading the fish table from CSV or JSON.
//!
//! CSV files carry a header row with a name column (`name` / `Name`), one
//! column per catalog attribute and an optional description column
//! (`description` / `Beschreibung`). Extra columns are ignored.
//!
//! JSON files hold an array of
//! `{"name", "attributes": {..}, "description"?, "embedding"?}` objects.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::record::{AttributeCatalog, CandidateRecord, CandidateStore};
use crate::config::{AppPaths, CatalogConfig};

/// The bundled data set: ten common freshwater and North/Baltic Sea fish.
const BUNDLED_CSV: &str = include_str!("../../data/fish.csv");

const NAME_COLUMNS: &[&str] = &["name"];
const DESCRIPTION_COLUMNS: &[&str] = &["description", "beschreibung"];

// ---------------------------------------------------------------------------
// CatalogError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("catalog file has no '{0}' column")]
    MissingColumn(String),

    #[error("attribute catalog must list at least one attribute")]
    EmptyCatalog,

    #[error("attribute '{0}' appears twice in the catalog")]
    DuplicateAttribute(String),
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Resolve the configured data source and build the store.
///
/// Order: `config.data_file`, then [`AppPaths::default_catalog_file`] if it
/// exists, then the bundled data set.
pub fn load_store(config: &CatalogConfig, paths: &AppPaths) -> Result<CandidateStore, CatalogError> {
    let catalog = AttributeCatalog::new(config.attributes.iter().cloned())?;

    let records = match &config.data_file {
        Some(path) => load_file(path, &catalog)?,
        None if paths.default_catalog_file.exists() => {
            load_file(&paths.default_catalog_file, &catalog)?
        }
        None => {
            log::info!("catalog: no data file configured, using bundled fish table");
            parse_csv(BUNDLED_CSV.as_bytes(), &catalog)?
        }
    };

    log::info!(
        "catalog: {} records, {} attributes",
        records.len(),
        catalog.len()
    );
    Ok(CandidateStore::new(catalog, records))
}

/// The bundled fish table with the default attribute catalog.
pub fn bundled_store() -> Result<CandidateStore, CatalogError> {
    let catalog = AttributeCatalog::new(CatalogConfig::default().attributes)?;
    let records = parse_csv(BUNDLED_CSV.as_bytes(), &catalog)?;
    Ok(CandidateStore::new(catalog, records))
}

/// Load records from a file, picking the format from its extension
/// (`.json` → JSON, anything else → CSV).
pub fn load_file(path: &Path, catalog: &AttributeCatalog) -> Result<Vec<CandidateRecord>, CatalogError> {
    log::debug!("catalog: loading {}", path.display());
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        let content = std::fs::read_to_string(path)?;
        parse_json(&content, catalog)
    } else {
        let file = std::fs::File::open(path)?;
        parse_csv(file, catalog)
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn find_column(headers: &csv::StringRecord, candidates: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| candidates.iter().any(|c| h.trim().eq_ignore_ascii_case(c)))
}

/// Parse CSV rows into records. Every catalog attribute must have a column.
pub fn parse_csv<R: Read>(reader: R, catalog: &AttributeCatalog) -> Result<Vec<CandidateRecord>, CatalogError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();

    let name_col = find_column(&headers, NAME_COLUMNS)
        .ok_or_else(|| CatalogError::MissingColumn("name".into()))?;
    let description_col = find_column(&headers, DESCRIPTION_COLUMNS);

    let attribute_cols = catalog
        .iter()
        .map(|attr| {
            headers
                .iter()
                .position(|h| h.trim() == attr)
                .map(|idx| (attr.to_string(), idx))
                .ok_or_else(|| CatalogError::MissingColumn(attr.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut records = Vec::new();
    for row in rdr.records() {
        let row = row?;
        let name = row.get(name_col).unwrap_or_default();
        if name.is_empty() {
            log::warn!("catalog: skipping row without a name");
            continue;
        }

        let mut record = CandidateRecord::new(name);
        for (attr, idx) in &attribute_cols {
            if let Some(value) = row.get(*idx) {
                record = record.with_attribute(attr.as_str(), value);
            }
        }
        if let Some(desc) = description_col.and_then(|idx| row.get(idx)) {
            record = record.with_description(desc);
        }
        records.push(record);
    }

    Ok(records)
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawRecord {
    name: String,
    #[serde(default)]
    attributes: std::collections::BTreeMap<String, Option<String>>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

/// Parse a JSON array of records. Attributes outside the catalog are ignored.
pub fn parse_json(content: &str, catalog: &AttributeCatalog) -> Result<Vec<CandidateRecord>, CatalogError> {
    let raw: Vec<RawRecord> = serde_json::from_str(content)?;

    let records = raw
        .into_iter()
        .map(|r| {
            let mut record = CandidateRecord::new(r.name);
            for (attr, value) in r.attributes {
                if catalog.position(&attr).is_none() {
                    continue;
                }
                if let Some(value) = value {
                    record = record.with_attribute(attr, value);
                }
            }
            if let Some(desc) = r.description {
                record = record.with_description(desc);
            }
            if let Some(embedding) = r.embedding {
                record = record.with_embedding(embedding);
            }
            record
        })
        .collect();

    Ok(records)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
