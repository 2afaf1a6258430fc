//! Meeting domain model.
//!
//! # Responsibility
//! - Define the canonical meeting record and its read projections.
//! - Define the loosely typed create input accepted from callers.
//!
//! # Invariants
//! - `id` and `created_at` never change after creation.
//! - `deleted` only ever moves from `false` to `true`.

use crate::model::id::RecordId;
use crate::model::identity::{Contact, Lead, User};
use crate::model::timestamp::EpochMillis;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Structural problems of a meeting record about to be stored or just read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeetingValidationError {
    EmptyAgenda,
    DuplicateAttendee(RecordId),
    DuplicateAttendeeLead(RecordId),
}

impl Display for MeetingValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyAgenda => write!(f, "meeting agenda must not be empty"),
            Self::DuplicateAttendee(id) => write!(f, "duplicate attendee id: {id}"),
            Self::DuplicateAttendeeLead(id) => write!(f, "duplicate attendee lead id: {id}"),
        }
    }
}

impl Error for MeetingValidationError {}

/// Canonical stored meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingRecord {
    pub id: RecordId,
    pub agenda: String,
    /// Contact ids in input order, duplicates removed.
    pub attendees: Vec<RecordId>,
    /// Lead ids in input order, duplicates removed.
    pub attendees_lead: Vec<RecordId>,
    pub location: Option<String>,
    pub related: Option<String>,
    /// Scheduled time in epoch milliseconds.
    pub date_time: Option<EpochMillis>,
    pub notes: Option<String>,
    pub created_by: RecordId,
    /// Creation time in epoch milliseconds, set by the writer.
    pub created_at: EpochMillis,
    /// Soft delete tombstone.
    pub deleted: bool,
}

impl MeetingRecord {
    /// Validates record invariants that storage relies on.
    pub fn validate(&self) -> Result<(), MeetingValidationError> {
        if self.agenda.is_empty() {
            return Err(MeetingValidationError::EmptyAgenda);
        }
        if let Some(id) = first_duplicate(&self.attendees) {
            return Err(MeetingValidationError::DuplicateAttendee(id));
        }
        if let Some(id) = first_duplicate(&self.attendees_lead) {
            return Err(MeetingValidationError::DuplicateAttendeeLead(id));
        }
        Ok(())
    }
}

fn first_duplicate(ids: &[RecordId]) -> Option<RecordId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().find(|id| !seen.insert(*id))
}

/// Create request as deserialized by the caller.
///
/// Fields stay loosely typed so the writer can report which field is wrong
/// instead of failing during deserialization. `null` counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeetingInput {
    pub agenda: Option<String>,
    pub attendees: Option<Value>,
    pub attendees_lead: Option<Value>,
    pub location: Option<String>,
    pub related: Option<String>,
    /// Date text or epoch milliseconds, coerced like list date bounds.
    pub date_time: Option<Value>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
}

impl MeetingInput {
    /// Creates an input with the two required fields populated.
    pub fn new(agenda: impl Into<String>, created_by: impl Into<String>) -> Self {
        Self {
            agenda: Some(agenda.into()),
            created_by: Some(created_by.into()),
            ..Self::default()
        }
    }
}

/// List row: the stored record plus the creator login taken from the join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingListItem {
    #[serde(flatten)]
    pub meeting: MeetingRecord,
    /// `None` when the creator does not resolve to a user.
    pub created_by_email: Option<String>,
}

/// Detail view with every relationship expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingDetail {
    pub id: RecordId,
    pub agenda: String,
    /// Resolved contacts; ids that no longer resolve are omitted.
    pub attendees: Vec<Contact>,
    /// Resolved leads; ids that no longer resolve are omitted.
    pub attendees_lead: Vec<Lead>,
    pub location: Option<String>,
    pub related: Option<String>,
    pub date_time: Option<EpochMillis>,
    pub notes: Option<String>,
    /// `None` when the creator id no longer resolves.
    pub created_by: Option<User>,
    pub created_at: EpochMillis,
    pub deleted: bool,
}
