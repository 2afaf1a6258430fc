//! Record identifier format and structural validation.
//!
//! # Responsibility
//! - Define the identifier type shared by meetings and identity records.
//! - Decide whether caller-provided strings are identifier-shaped.
//!
//! # Invariants
//! - Validation is purely structural; it never consults the store.
//! - Stored identifiers always use the lowercase hyphenated UUID form.

use uuid::Uuid;

/// Stable identifier for meetings, users, contacts and leads.
pub type RecordId = Uuid;

/// Returns whether `value` is a structurally valid record identifier.
///
/// Accepts every textual UUID form understood by the `uuid` crate
/// (hyphenated, simple, braced, urn). Existence is not checked.
pub fn is_valid_id(value: &str) -> bool {
    parse_id(value).is_some()
}

/// Parses a caller-provided identifier into its normalized form.
pub fn parse_id(value: &str) -> Option<RecordId> {
    Uuid::try_parse(value).ok()
}

/// Generates a fresh identifier for a new record.
pub fn new_id() -> RecordId {
    Uuid::new_v4()
}
