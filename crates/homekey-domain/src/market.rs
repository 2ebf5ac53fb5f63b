//! Market trend classification and formatting

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction and strength of a market trend percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrendLabel {
    /// Trend above +5%
    StrongGrowth,
    /// Trend above 0% up to +5%
    HealthyGrowth,
    /// Trend below 0%
    Declining,
    /// Exactly 0% (or not a number)
    Stable,
}

impl TrendLabel {
    /// Growth above this percentage is considered strong
    pub const STRONG_GROWTH_ABOVE: f64 = 5.0;

    /// Classify a signed trend percentage
    ///
    /// Rules are evaluated in order, first match wins:
    /// `> 5` strong growth, `> 0` healthy growth, `< 0` declining, else stable.
    pub fn from_trend(trend: f64) -> Self {
        if trend > Self::STRONG_GROWTH_ABOVE {
            TrendLabel::StrongGrowth
        } else if trend > 0.0 {
            TrendLabel::HealthyGrowth
        } else if trend < 0.0 {
            TrendLabel::Declining
        } else {
            TrendLabel::Stable
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            TrendLabel::StrongGrowth => "Strong Growth",
            TrendLabel::HealthyGrowth => "Healthy Growth",
            TrendLabel::Declining => "Declining",
            TrendLabel::Stable => "Stable",
        }
    }
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Smallest magnitude written without an exponent
const MIN_PLAIN: f64 = 1e-6;

/// Magnitude from which an exponent would be needed
const MAX_PLAIN: f64 = 1e21;

/// Whether `value` lies in the range `format_number` writes as a plain decimal
///
/// Outside `1e-6 <= |value| < 1e21` browsers switch to exponent notation
/// (`1e+21`, `1e-7`) while `format_number` would not, so tables must keep
/// their figures inside it.
pub fn has_plain_form(value: f64) -> bool {
    if value == 0.0 {
        return true;
    }
    let magnitude = value.abs();
    (MIN_PLAIN..MAX_PLAIN).contains(&magnitude)
}

/// Render a number in shortest round-trip form (`4.2`, `6`, `-1.2`)
///
/// Negative zero renders as `0`. Only values accepted by
/// [`has_plain_form`] render the same way a browser would.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    format!("{}", value)
}

/// Render a trend as a signed percentage: `+6%`, `0%`, `-2%`
///
/// # Examples
///
/// ```
/// use homekey_domain::market::format_trend;
///
/// assert_eq!(format_trend(4.2), "+4.2%");
/// assert_eq!(format_trend(-1.2), "-1.2%");
/// assert_eq!(format_trend(0.0), "0%");
/// ```
pub fn format_trend(trend: f64) -> String {
    let sign = if trend > 0.0 { "+" } else { "" };
    format!("{}{}%", sign, format_number(trend))
}
