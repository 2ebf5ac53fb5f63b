//! Property context composition
//!
//! Renders listing details and an intelligence record into the plain-text
//! document the assistant receives as background knowledge. Composition is
//! a pure function of its inputs: the same inputs always produce the same
//! bytes, so callers may cache the result by (slug, catalog version).

use crate::intelligence::{DataCategory, IntelligenceRecord};
use crate::market::format_trend;
use crate::property::{ComposeError, PropertyDetails};
use serde::Serialize;
use std::fmt;
use std::ops::Deref;

/// Rendered when a category partition is empty
const NONE_SENTINEL: &str = "None";

/// Rendered in place of the alert list when there are no alerts
const NO_ALERTS: &str = "No active alerts";

// Static block reproduced as-is for every property.
const PROPERTY_FEATURES: &str = "\
## Property Features:
- Smart Home Integration
- Spacious Living Areas
- Energy Efficiency
- Natural Light
- Security Systems
- Outdoor Spaces
- Private Pool (in some units)
- Modern Keypad Entry
- Built in 2025 with sustainable features
";

/// Composed assistant context for one property
///
/// Immutable once built. Dereferences to the rendered text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PropertyContext(String);

impl PropertyContext {
    /// Rendered text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the rendered text
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Deref for PropertyContext {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PropertyContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compose the assistant context for a property
///
/// Sections, in order: basic details, intelligence summary, data
/// completeness by category, active alerts, static feature list.
///
/// # Errors
///
/// Returns [`ComposeError::MissingField`] if a required listing attribute
/// is blank.
pub fn compose(
    property: &PropertyDetails,
    intelligence: &IntelligenceRecord,
) -> Result<PropertyContext, ComposeError> {
    property.validate()?;

    let mut out = String::with_capacity(2048);

    out.push('\n');
    out.push_str("## Basic Property Details:\n");
    out.push_str(&format!("- Name: {}\n", property.name));
    out.push_str(&format!("- Location: {}\n", property.location));
    out.push_str(&format!("- Price: ${}\n", property.price));
    out.push_str(&format!("- Bedrooms: {}\n", property.beds));
    out.push_str(&format!("- Bathrooms: {}\n", property.baths));
    out.push_str(&format!("- Area: {}m²\n", property.area));
    out.push('\n');

    out.push_str("## Property Intelligence Data:\n");
    out.push_str(&format!(
        "- Confidence Score: {}/100 ({} Confidence)\n",
        intelligence.confidence_score,
        intelligence.confidence_level()
    ));
    out.push_str(&format!(
        "- Data Sources: {} verified sources\n",
        intelligence.data_sources
    ));
    out.push_str(&format!("- Last Updated: {}\n", intelligence.last_updated));
    out.push_str(&format!(
        "- Title Status: {}\n",
        intelligence.title_status.label()
    ));
    out.push_str(&format!(
        "- Market Trend: {} ({})\n",
        format_trend(intelligence.market_trend),
        intelligence.trend_label()
    ));
    out.push('\n');

    out.push_str("## Data Completeness by Category:\n");
    let categories: Vec<String> = intelligence
        .data_categories
        .iter()
        .map(render_category)
        .collect();
    out.push_str(&categories.join("\n"));
    out.push_str("\n\n");

    out.push_str(&format!(
        "## Active Alerts ({}):\n",
        intelligence.alerts.len()
    ));
    if intelligence.alerts.is_empty() {
        out.push_str(NO_ALERTS);
    } else {
        let alerts: Vec<String> = intelligence
            .alerts
            .iter()
            .map(|alert| {
                format!(
                    "- [{}] {}: {}",
                    alert.severity.tag(),
                    alert.title,
                    alert.description
                )
            })
            .collect();
        out.push_str(&alerts.join("\n"));
    }
    out.push_str("\n\n");

    out.push_str(PROPERTY_FEATURES);

    Ok(PropertyContext(out))
}

fn render_category(category: &DataCategory) -> String {
    format!(
        "\n### {}: {}%\nAvailable: {}\nMissing: {}",
        category.name,
        category.percentage,
        join_or_none(&category.available_names()),
        join_or_none(&category.missing_names())
    )
}

fn join_or_none(names: &[&str]) -> String {
    if names.is_empty() {
        NONE_SENTINEL.to_string()
    } else {
        names.join(", ")
    }
}
