//! Property intelligence records
//!
//! An intelligence record is static reference data describing how much is
//! known about a property: a confidence score, per-category data
//! completeness, title status, market trend and active alerts.
//! Wire format is camelCase JSON.

use crate::confidence::ConfidenceLevel;
use crate::market::TrendLabel;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of an intelligence alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Informational notice
    Info,
    /// Something worth checking
    Warning,
    /// Blocking or high-risk issue
    Danger,
}

impl AlertSeverity {
    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "info",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Danger => "danger",
        }
    }

    /// Uppercase tag used when rendering alerts into text
    pub fn tag(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "INFO",
            AlertSeverity::Warning => "WARNING",
            AlertSeverity::Danger => "DANGER",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An alert attached to a property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Alert severity (serialized as `type`)
    #[serde(rename = "type")]
    pub severity: AlertSeverity,
    /// Short title
    pub title: String,
    /// One or two sentence description
    pub description: String,
    /// Icon identifier for the dashboard
    #[serde(default)]
    pub icon: String,
}

/// A single named data point and whether it is on file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataItem {
    /// Item name, e.g. "Flood Zone"
    pub name: String,
    /// Whether the data is available
    pub available: bool,
}

/// A group of data items with an overall completeness percentage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataCategory {
    /// Category name, e.g. "Legal & Title"
    pub name: String,
    /// Completeness percentage (0-100)
    pub percentage: u8,
    /// Items in display order
    pub items: Vec<DataItem>,
}

impl DataCategory {
    /// Names of available items, in order
    pub fn available_names(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter(|item| item.available)
            .map(|item| item.name.as_str())
            .collect()
    }

    /// Names of missing items, in order
    pub fn missing_names(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter(|item| !item.available)
            .map(|item| item.name.as_str())
            .collect()
    }
}

/// Title status of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleStatus {
    /// Title is clear
    Clear,
    /// Title under review
    Pending,
    /// Known title problems
    Issue,
}

impl TitleStatus {
    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            TitleStatus::Clear => "clear",
            TitleStatus::Pending => "pending",
            TitleStatus::Issue => "issue",
        }
    }

    /// Descriptive label used in the assistant context
    pub fn label(&self) -> &'static str {
        match self {
            TitleStatus::Clear => "Clear",
            TitleStatus::Pending => "Pending Review",
            TitleStatus::Issue => "Has Issues",
        }
    }
}

/// Intelligence data for one property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntelligenceRecord {
    /// Confidence score (0-100)
    pub confidence_score: u8,
    /// Freshness label, e.g. "2 days ago"
    pub last_updated: String,
    /// Number of verified data sources
    pub data_sources: u32,
    /// Title status
    pub title_status: TitleStatus,
    /// Signed market trend percentage
    pub market_trend: f64,
    /// Data completeness by category, in display order
    pub data_categories: Vec<DataCategory>,
    /// Active alerts, in display order
    pub alerts: Vec<Alert>,
}

impl IntelligenceRecord {
    /// Confidence band for this record's score
    pub fn confidence_level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_score(self.confidence_score)
    }

    /// Trend label for this record's market trend
    pub fn trend_label(&self) -> TrendLabel {
        TrendLabel::from_trend(self.market_trend)
    }

    /// Mean category percentage, rounded half up. Zero with no categories.
    pub fn overall_completeness(&self) -> u8 {
        if self.data_categories.is_empty() {
            return 0;
        }
        let total: u32 = self
            .data_categories
            .iter()
            .map(|cat| u32::from(cat.percentage))
            .sum();
        let mean = f64::from(total) / self.data_categories.len() as f64;
        (mean + 0.5).floor() as u8
    }

    /// Number of alerts per severity
    pub fn alert_counts(&self) -> AlertCounts {
        self.alerts
            .iter()
            .fold(AlertCounts::default(), |mut counts, alert| {
                match alert.severity {
                    AlertSeverity::Info => counts.info += 1,
                    AlertSeverity::Warning => counts.warning += 1,
                    AlertSeverity::Danger => counts.danger += 1,
                }
                counts
            })
    }

    /// Derived figures shown at the top of the dashboard
    pub fn summary(&self) -> DashboardSummary {
        DashboardSummary {
            overall_completeness: self.overall_completeness(),
            confidence_level: self.confidence_level(),
            trend_label: self.trend_label(),
            alert_counts: self.alert_counts(),
        }
    }
}

/// Alert tally by severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertCounts {
    /// Informational alerts
    pub info: usize,
    /// Warnings
    pub warning: usize,
    /// Danger alerts
    pub danger: usize,
}

/// Figures derived from an intelligence record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    /// Rounded mean of category percentages
    pub overall_completeness: u8,
    /// Confidence band
    pub confidence_level: ConfidenceLevel,
    /// Market trend label
    pub trend_label: TrendLabel,
    /// Alerts by severity
    pub alert_counts: AlertCounts,
}
