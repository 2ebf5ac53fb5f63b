//! Confidence level derived from an intelligence confidence score

use serde::{Deserialize, Serialize};
use std::fmt;

/// Qualitative band for a 0-100 confidence score
///
/// Thresholds are inclusive lower bounds, evaluated top-down:
/// - `High`: score >= 80
/// - `Medium`: score >= 60
/// - `Low`: everything else
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    /// Score of at least 80
    High,
    /// Score of at least 60
    Medium,
    /// Score below 60
    Low,
}

impl ConfidenceLevel {
    /// Minimum score for `High`
    pub const HIGH_THRESHOLD: u8 = 80;

    /// Minimum score for `Medium`
    pub const MEDIUM_THRESHOLD: u8 = 60;

    /// Classify a confidence score
    ///
    /// # Examples
    ///
    /// ```
    /// use homekey_domain::ConfidenceLevel;
    ///
    /// assert_eq!(ConfidenceLevel::from_score(80), ConfidenceLevel::High);
    /// assert_eq!(ConfidenceLevel::from_score(79), ConfidenceLevel::Medium);
    /// assert_eq!(ConfidenceLevel::from_score(59), ConfidenceLevel::Low);
    /// ```
    pub fn from_score(score: u8) -> Self {
        if score >= Self::HIGH_THRESHOLD {
            ConfidenceLevel::High
        } else if score >= Self::MEDIUM_THRESHOLD {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    /// Display label ("High", "Medium", "Low")
    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "High",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::Low => "Low",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
