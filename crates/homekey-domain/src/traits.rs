//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Infrastructure implementations live in other crates.

use crate::IntelligenceRecord;

/// Read-only source of property intelligence
///
/// Implemented by the reference-data layer (homekey-catalog).
/// A lookup never fails: slugs without an entry resolve to a default record
/// so every property has a renderable dashboard.
pub trait IntelligenceSource: Send + Sync {
    /// Record for `slug`, or the default record when there is no entry
    fn lookup(&self, slug: &str) -> &IntelligenceRecord;

    /// Whether `slug` has an explicit entry
    fn contains(&self, slug: &str) -> bool;

    /// Version of the backing table, for cache keys
    fn version(&self) -> &str;
}
