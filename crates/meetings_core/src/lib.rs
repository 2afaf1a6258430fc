//! Core domain logic for CRM meeting records.
//! This crate is the single source of truth for meeting lifecycle invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::id::{is_valid_id, parse_id, RecordId};
pub use model::identity::{Contact, Lead, User};
pub use model::meeting::{
    MeetingDetail, MeetingInput, MeetingListItem, MeetingRecord, MeetingValidationError,
};
pub use model::timestamp::{coerce_timestamp, EpochMillis};
pub use query::filter::MeetingFilter;
pub use query::pipeline::{ListPipeline, Stage};
pub use repo::identity_repo::{IdentityRepository, SqliteIdentityRepository};
pub use repo::meeting_repo::{MeetingRepository, RepoError, RepoResult, SqliteMeetingRepository};
pub use service::meeting_service::{
    DeleteManyOutcome, MeetingError, MeetingResult, MeetingService, MeetingServiceOptions,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
