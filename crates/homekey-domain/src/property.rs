//! Listing attributes used to identify a property in the assistant context

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A required property attribute was absent or blank
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    /// Named field is missing or contains only whitespace
    #[error("Missing required property field: {0}")]
    MissingField(&'static str),
}

/// Basic listing details for a property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDetails {
    /// Listing name, e.g. "Serenity Height Villas"
    pub name: String,
    /// Location text
    pub location: String,
    /// Asking price as displayed (without currency symbol), e.g. "570,000"
    pub price: String,
    /// Bedroom count
    pub beds: u32,
    /// Bathroom count
    pub baths: u32,
    /// Floor area in square metres
    pub area: u32,
}

impl PropertyDetails {
    /// Check that every text attribute is present
    ///
    /// Numeric attributes are always present once parsed.
    pub fn validate(&self) -> Result<(), ComposeError> {
        let required = [
            ("name", &self.name),
            ("location", &self.location),
            ("price", &self.price),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ComposeError::MissingField(field));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> PropertyDetails {
        PropertyDetails {
            name: "Modern Luxe Villa".to_string(),
            location: "20 S Aurora Ave, Miami".to_string(),
            price: "570,000".to_string(),
            beds: 4,
            baths: 3,
            area: 120,
        }
    }

    #[test]
    fn test_valid_details() {
        assert!(details().validate().is_ok());
    }

    #[test]
    fn test_blank_name_rejected() {
        let mut d = details();
        d.name = "   ".to_string();
        assert_eq!(d.validate(), Err(ComposeError::MissingField("name")));
    }

    #[test]
    fn test_empty_price_rejected() {
        let mut d = details();
        d.price = String::new();
        assert_eq!(d.validate(), Err(ComposeError::MissingField("price")));
    }

    #[test]
    fn test_missing_field_fails_to_parse() {
        let json = r#"{"name": "A", "location": "B", "beds": 1, "baths": 1, "area": 10}"#;
        assert!(serde_json::from_str::<PropertyDetails>(json).is_err());
    }
}
