//! HomeKey Domain Layer
//!
//! Core value objects and pure logic for the HomeKey property assistant.
//! Everything here is synchronous and side-effect free; infrastructure
//! (reference tables, model providers, HTTP) lives in other crates.
//!
//! ## Key Concepts
//!
//! - **PropertyDetails**: listing attributes supplied by the UI
//! - **IntelligenceRecord**: confidence, completeness, title, trend and alerts
//! - **PropertyContext**: the deterministic text document composed from both
//! - **Conversation**: role-tagged messages owned by the client
//!
//! ## Example
//!
//! ```
//! use homekey_domain::{compose, IntelligenceRecord, PropertyDetails, TitleStatus};
//!
//! let property = PropertyDetails {
//!     name: "Royal Orchid Villas".to_string(),
//!     location: "Miami, FL".to_string(),
//!     price: "650,000".to_string(),
//!     beds: 5,
//!     baths: 4,
//!     area: 180,
//! };
//! let intelligence = IntelligenceRecord {
//!     confidence_score: 95,
//!     last_updated: "Today".to_string(),
//!     data_sources: 18,
//!     title_status: TitleStatus::Clear,
//!     market_trend: 8.5,
//!     data_categories: vec![],
//!     alerts: vec![],
//! };
//!
//! let context = compose(&property, &intelligence).unwrap();
//! assert!(context.contains("- Market Trend: +8.5% (Strong Growth)"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod confidence;
pub mod context;
pub mod conversation;
pub mod intelligence;
pub mod market;
pub mod property;
pub mod traits;

// Re-exports for convenience
pub use confidence::ConfidenceLevel;
pub use context::{compose, PropertyContext};
pub use conversation::{Conversation, Message, MessageId, Role};
pub use intelligence::{
    Alert, AlertCounts, AlertSeverity, DashboardSummary, DataCategory, DataItem,
    IntelligenceRecord, TitleStatus,
};
pub use market::TrendLabel;
pub use property::{ComposeError, PropertyDetails};
pub use traits::IntelligenceSource;
