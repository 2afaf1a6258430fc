//! Identity entities referenced by meetings.
//!
//! These records are owned by the surrounding CRM; the meetings core only
//! reads them to join creator logins and expand attendee lists.

use crate::model::id::RecordId;
use serde::{Deserialize, Serialize};

/// Authoring user of a meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: RecordId,
    /// Login handle, usually an email address.
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Non-lead person attending a meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: RecordId,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Sales lead attending a meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: RecordId,
    pub lead_name: String,
    pub lead_email: Option<String>,
    pub lead_phone: Option<String>,
}
