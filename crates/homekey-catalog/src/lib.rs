//! HomeKey Intelligence Catalog
//!
//! Read-only reference table of property intelligence, keyed by property
//! slug. Implements the `IntelligenceSource` trait from `homekey-domain`.
//!
//! # Architecture
//!
//! - The built-in table is embedded JSON (`data/intelligence.json`)
//! - Parsed and validated once at startup, immutable afterwards
//! - Unknown slugs resolve to the table's default record, never an error
//!
//! # Examples
//!
//! ```
//! use homekey_catalog::IntelligenceCatalog;
//! use homekey_domain::traits::IntelligenceSource;
//!
//! let catalog = IntelligenceCatalog::builtin().unwrap();
//! let record = catalog.lookup("royal-orchid-villas");
//! assert_eq!(record.confidence_score, 95);
//!
//! let fallback = catalog.lookup("no-such-property");
//! assert_eq!(fallback, catalog.default_record());
//! ```

#![warn(missing_docs)]

use homekey_domain::market::has_plain_form;
use homekey_domain::traits::IntelligenceSource;
use homekey_domain::IntelligenceRecord;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Embedded reference table
const BUILTIN_TABLE: &str = include_str!("../data/intelligence.json");

/// Errors that can occur while loading a catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Failed to read a table file
    #[error("Failed to read catalog file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Table is not valid JSON or does not match the record schema
    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    /// A record holds out-of-range values
    #[error("Invalid record '{slug}': {reason}")]
    InvalidRecord {
        /// Slug of the offending record ("default" for the default record)
        slug: String,
        /// What is wrong
        reason: String,
    },
}

/// On-disk table layout
#[derive(Deserialize)]
struct CatalogTable {
    version: String,
    default: IntelligenceRecord,
    properties: BTreeMap<String, IntelligenceRecord>,
}

/// Immutable intelligence table
///
/// Safe to share across threads without locking; wrap in `Arc` to share.
#[derive(Debug, Clone)]
pub struct IntelligenceCatalog {
    version: String,
    default: IntelligenceRecord,
    records: BTreeMap<String, IntelligenceRecord>,
}

impl IntelligenceCatalog {
    /// Load the table compiled into the binary
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_TABLE)
    }

    /// Parse a table from JSON text
    ///
    /// Expected shape: `{ "version": "...", "default": {record}, "properties": { "slug": {record} } }`
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let table: CatalogTable = serde_json::from_str(json)?;

        validate_record("default", &table.default)?;
        for (slug, record) in &table.properties {
            validate_record(slug, record)?;
        }

        debug!(
            "Loaded intelligence catalog version {} with {} properties",
            table.version,
            table.properties.len()
        );

        Ok(Self {
            version: table.version,
            default: table.default,
            records: table.properties,
        })
    }

    /// Load a table from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// The record returned for unknown slugs
    pub fn default_record(&self) -> &IntelligenceRecord {
        &self.default
    }

    /// Slugs with explicit entries, sorted
    pub fn slugs(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Number of explicit entries
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the table has no explicit entries
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl IntelligenceSource for IntelligenceCatalog {
    fn lookup(&self, slug: &str) -> &IntelligenceRecord {
        self.records.get(slug).unwrap_or(&self.default)
    }

    fn contains(&self, slug: &str) -> bool {
        self.records.contains_key(slug)
    }

    fn version(&self) -> &str {
        &self.version
    }
}

fn validate_record(slug: &str, record: &IntelligenceRecord) -> Result<(), CatalogError> {
    let invalid = |reason: String| CatalogError::InvalidRecord {
        slug: slug.to_string(),
        reason,
    };

    if record.confidence_score > 100 {
        return Err(invalid(format!(
            "confidence score {} exceeds 100",
            record.confidence_score
        )));
    }

    if !record.market_trend.is_finite() {
        return Err(invalid("market trend is not a finite number".to_string()));
    }

    if !has_plain_form(record.market_trend) {
        return Err(invalid(format!(
            "market trend {:e} is outside the displayable range",
            record.market_trend
        )));
    }

    for category in &record.data_categories {
        if category.percentage > 100 {
            return Err(invalid(format!(
                "category '{}' percentage {} exceeds 100",
                category.name, category.percentage
            )));
        }
    }

    Ok(())
}
