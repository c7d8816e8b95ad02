//! Candidate data: the attribute catalog, fish records and their loaders.

pub mod loader;
pub mod record;

pub use loader::{bundled_store, load_file, load_store, parse_csv, parse_json, CatalogError};
pub use record::{AttributeCatalog, CandidateRecord, CandidateStore};
