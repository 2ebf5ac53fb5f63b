//! Integration tests for homekey-catalog
//!
//! These tests exercise the built-in table and file loading.

use homekey_catalog::{CatalogError, IntelligenceCatalog};
use homekey_domain::traits::IntelligenceSource;
use homekey_domain::{compose, AlertSeverity, PropertyDetails, TitleStatus};
use std::io::Write;

#[test]
fn test_default_record_for_unknown_slug() {
    let catalog = IntelligenceCatalog::builtin().unwrap();
    let record = catalog.lookup("nonexistent-slug");

    assert_eq!(record, catalog.default_record());
    assert_eq!(record.confidence_score, 50);
    assert_eq!(record.title_status, TitleStatus::Pending);
    assert_eq!(record.market_trend, 0.0);
    assert_eq!(record.last_updated, "Unknown");
    assert_eq!(record.data_sources, 0);
    assert_eq!(record.alerts.len(), 1);
    assert_eq!(record.alerts[0].severity, AlertSeverity::Warning);
    assert_eq!(record.alerts[0].title, "Limited Data Available");
}

#[test]
fn test_default_record_only_address_available() {
    let catalog = IntelligenceCatalog::builtin().unwrap();
    let record = catalog.default_record();

    assert_eq!(record.data_categories.len(), 4);
    let available: Vec<&str> = record
        .data_categories
        .iter()
        .flat_map(|cat| cat.available_names())
        .collect();
    assert_eq!(available, vec!["Address"]);
}

#[test]
fn test_builtin_records() {
    let catalog = IntelligenceCatalog::builtin().unwrap();

    let serenity = catalog.lookup("serenity-height-villas");
    assert_eq!(serenity.confidence_score, 87);
    assert_eq!(serenity.data_sources, 12);
    assert_eq!(serenity.market_trend, 4.2);
    assert_eq!(serenity.alerts.len(), 3);

    let grand = catalog.lookup("grand-cista-villas");
    assert_eq!(grand.title_status, TitleStatus::Issue);
    assert_eq!(grand.market_trend, -1.2);

    for slug in catalog.slugs() {
        let record = catalog.lookup(slug);
        assert_ne!(record, catalog.default_record(), "{} resolved to default", slug);
        assert_eq!(record.data_categories.len(), 4, "{} category count", slug);
    }
}

#[test]
fn test_compose_from_catalog_record() {
    let catalog = IntelligenceCatalog::builtin().unwrap();
    let property = PropertyDetails {
        name: "Grand Cista Villas".to_string(),
        location: "Miami, FL".to_string(),
        price: "480,000".to_string(),
        beds: 3,
        baths: 2,
        area: 95,
    };

    let context = compose(&property, catalog.lookup("grand-cista-villas")).unwrap();
    assert!(context.contains("- Confidence Score: 65/100 (Medium Confidence)"));
    assert!(context.contains("- Title Status: Has Issues"));
    assert!(context.contains("- Market Trend: -1.2% (Declining)"));
    assert!(context.contains("## Active Alerts (3):"));
    assert!(context.contains("- [DANGER] Potential Lien Issue:"));
}

#[test]
fn test_from_file() {
    let table = r#"{
        "version": "file-7",
        "default": {
            "confidenceScore": 10, "lastUpdated": "Never", "dataSources": 0,
            "titleStatus": "pending", "marketTrend": 0, "dataCategories": [], "alerts": []
        },
        "properties": {}
    }"#;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(table.as_bytes()).unwrap();

    let catalog = IntelligenceCatalog::from_file(file.path()).unwrap();
    assert_eq!(catalog.version(), "file-7");
    assert!(catalog.is_empty());
    assert_eq!(catalog.lookup("anything").confidence_score, 10);
}

#[test]
fn test_from_missing_file() {
    let result = IntelligenceCatalog::from_file("/definitely/not/here.json");
    assert!(matches!(result, Err(CatalogError::FileRead(_))));
}
