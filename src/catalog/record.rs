//! Attribute catalog, fish records and the shared candidate store.

use std::collections::{BTreeMap, HashSet};

use super::loader::CatalogError;

// ---------------------------------------------------------------------------
// AttributeCatalog
// ---------------------------------------------------------------------------

/// Ordered list of attribute names; the order is the question order.
///
/// Fixed once built; there is no API to reorder or extend it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeCatalog {
    attributes: Vec<String>,
}

impl AttributeCatalog {
    /// Build a catalog from attribute names.
    ///
    /// Names are trimmed; an empty list or a repeated name is rejected.
    pub fn new<I, S>(attributes: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let attributes: Vec<String> = attributes
            .into_iter()
            .map(|a| a.into().trim().to_string())
            .collect();

        if attributes.is_empty() || attributes.iter().any(|a| a.is_empty()) {
            return Err(CatalogError::EmptyCatalog);
        }

        let mut seen = HashSet::with_capacity(attributes.len());
        for attr in &attributes {
            if !seen.insert(attr.as_str()) {
                return Err(CatalogError::DuplicateAttribute(attr.clone()));
            }
        }

        Ok(Self { attributes })
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Attribute asked at `step`, if any.
    pub fn get(&self, step: usize) -> Option<&str> {
        self.attributes.get(step).map(String::as_str)
    }

    pub fn position(&self, attribute: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a == attribute)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// CandidateRecord
// ---------------------------------------------------------------------------

/// One fish species.
///
/// Attribute values that are absent (or blank in the source file) are
/// missing: they are never offered as options and never match an answer.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRecord {
    /// Display label. Not guaranteed unique.
    pub name: String,
    attributes: BTreeMap<String, String>,
    /// Free-text description; composed from the attributes when absent.
    pub description: Option<String>,
    /// Precomputed embedding of the description.
    pub embedding: Option<Vec<f32>>,
}

impl CandidateRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
            description: None,
            embedding: None,
        }
    }

    /// Set an attribute value. Blank values are dropped (treated as missing).
    pub fn with_attribute(mut self, attribute: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        let value = value.trim();
        if !value.is_empty() {
            self.attributes.insert(attribute.into(), value.to_string());
        }
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        if !description.trim().is_empty() {
            self.description = Some(description.trim().to_string());
        }
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Value of `attribute`, `None` when missing.
    pub fn value(&self, attribute: &str) -> Option<&str> {
        self.attributes.get(attribute).map(String::as_str)
    }

    /// Literal equality filter. A missing value never matches.
    pub fn matches(&self, attribute: &str, answer: &str) -> bool {
        self.value(attribute) == Some(answer)
    }

    /// The stored description, or `"attribute: value, ..."` in catalog order.
    pub fn describe(&self, catalog: &AttributeCatalog) -> String {
        if let Some(desc) = &self.description {
            return desc.clone();
        }
        catalog
            .iter()
            .filter_map(|attr| self.value(attr).map(|v| format!("{attr}: {v}")))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ---------------------------------------------------------------------------
// CandidateStore
// ---------------------------------------------------------------------------

/// The loaded fish table. Read-only after construction; share it via `Arc`.
#[derive(Debug, Clone)]
pub struct CandidateStore {
    catalog: AttributeCatalog,
    records: Vec<CandidateRecord>,
}

impl CandidateStore {
    pub fn new(catalog: AttributeCatalog, records: Vec<CandidateRecord>) -> Self {
        for attr in catalog.iter() {
            if !records.iter().any(|r| r.value(attr).is_some()) {
                log::warn!("catalog: attribute '{attr}' has no value in any record");
            }
        }
        Self { catalog, records }
    }

    pub fn catalog(&self) -> &AttributeCatalog {
        &self.catalog
    }

    pub fn records(&self) -> &[CandidateRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&CandidateRecord> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
