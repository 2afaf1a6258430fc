//! Meeting use-case service.
//!
//! # Responsibility
//! - Validate create input and persist new meetings.
//! - Serve detail (expanded) and list (filtered, joined) reads.
//! - Run single and all-or-nothing bulk soft deletes.
//!
//! # Invariants
//! - Every caller-provided id passes `is_valid_id` before reaching the store.
//! - Validation failures are reported before any mutation is attempted.
//! - Bulk delete checks existence, then updates in a second statement. A
//!   concurrent delete in between is tolerated; the update is idempotent.

use crate::model::id::{is_valid_id, new_id, parse_id, RecordId};
use crate::model::meeting::{MeetingDetail, MeetingInput, MeetingListItem, MeetingRecord};
use crate::model::timestamp::{coerce_timestamp, now_epoch_ms, EpochMillis};
use crate::query::filter::MeetingFilter;
use crate::repo::identity_repo::IdentityRepository;
use crate::repo::meeting_repo::{MeetingRepository, RepoError};
use log::{info, warn};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const AGENDA_FIELD: &str = "agenda";
pub const CREATED_BY_FIELD: &str = "createdBy";
pub const ATTENDEES_FIELD: &str = "attendees";
pub const ATTENDEES_LEAD_FIELD: &str = "attendeesLead";
pub const DATE_TIME_FIELD: &str = "dateTime";
pub const ID_FIELD: &str = "id";

pub type MeetingResult<T> = Result<T, MeetingError>;

/// Failure taxonomy for meeting use-cases.
#[derive(Debug)]
pub enum MeetingError {
    /// A required field is absent or empty.
    MissingField(&'static str),
    /// An identifier field is malformed, or does not resolve when references
    /// are verified. `invalid` lists the offending values.
    InvalidReference {
        field: &'static str,
        invalid: Vec<String>,
    },
    /// A non-identifier field cannot be interpreted.
    InvalidField {
        field: &'static str,
        message: String,
    },
    /// Bulk input contains malformed ids; nothing was deleted.
    InvalidIdentifiers(Vec<String>),
    /// Bulk input references unknown ids; nothing was deleted.
    MissingIdentifiers(Vec<String>),
    /// Single-record target is absent or already deleted.
    NotFound(RecordId),
    /// Datastore failure, including rejected date coercion.
    Store(RepoError),
}

impl MeetingError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "missing_field",
            Self::InvalidReference { .. } => "invalid_reference",
            Self::InvalidField { .. } => "invalid_field",
            Self::InvalidIdentifiers(_) => "invalid_identifiers",
            Self::MissingIdentifiers(_) => "missing_identifiers",
            Self::NotFound(_) => "not_found",
            Self::Store(_) => "store_error",
        }
    }

    /// HTTP-style status for the surrounding transport.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingField(_)
            | Self::InvalidReference { .. }
            | Self::InvalidField { .. }
            | Self::InvalidIdentifiers(_) => 400,
            Self::MissingIdentifiers(_) | Self::NotFound(_) => 404,
            Self::Store(_) => 500,
        }
    }

    /// JSON error body carrying the offending field or id list.
    ///
    /// Store failures expose only a generic message.
    pub fn to_payload(&self) -> Value {
        match self {
            Self::MissingField(field) => json!({
                "error": self.to_string(),
                "code": self.code(),
                "field": field,
            }),
            Self::InvalidReference { field, invalid } => json!({
                "error": self.to_string(),
                "code": self.code(),
                "field": field,
                "invalidValues": invalid,
            }),
            Self::InvalidField { field, .. } => json!({
                "error": self.to_string(),
                "code": self.code(),
                "field": field,
            }),
            Self::InvalidIdentifiers(ids) => json!({
                "error": self.to_string(),
                "code": self.code(),
                "invalidIds": ids,
            }),
            Self::MissingIdentifiers(ids) => json!({
                "error": self.to_string(),
                "code": self.code(),
                "missingIds": ids,
            }),
            Self::NotFound(id) => json!({
                "error": self.to_string(),
                "code": self.code(),
                "id": id,
            }),
            Self::Store(_) => json!({
                "error": "internal server error",
                "code": self.code(),
            }),
        }
    }
}

impl Display for MeetingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing {field} value"),
            Self::InvalidReference { field, .. } => write!(f, "invalid or missing {field} value"),
            Self::InvalidField { field, message } => write!(f, "invalid {field} value: {message}"),
            Self::InvalidIdentifiers(ids) => {
                write!(f, "{} invalid meeting id(s)", ids.len())
            }
            Self::MissingIdentifiers(ids) => {
                write!(f, "{} meeting id(s) not found", ids.len())
            }
            Self::NotFound(id) => write!(f, "meeting not found: {id}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for MeetingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for MeetingError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeetingServiceOptions {
    /// Also require `createdBy`, `attendees` and `attendeesLead` to resolve
    /// in the identity store. Off by default: only id shape is checked.
    pub verify_references: bool,
}

/// Confirmation returned by a successful bulk delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeleteManyOutcome {
    /// Records touched by the batch update, previously deleted ones included.
    pub matched: usize,
}

/// Use-case service over meeting and identity repositories.
pub struct MeetingService<M: MeetingRepository, I: IdentityRepository> {
    meetings: M,
    identities: I,
    options: MeetingServiceOptions,
}

impl<M: MeetingRepository, I: IdentityRepository> MeetingService<M, I> {
    /// Creates a service with default options.
    pub fn new(meetings: M, identities: I) -> Self {
        Self::with_options(meetings, identities, MeetingServiceOptions::default())
    }

    pub fn with_options(meetings: M, identities: I, options: MeetingServiceOptions) -> Self {
        Self {
            meetings,
            identities,
            options,
        }
    }

    /// Validates `input` and stores a new meeting.
    ///
    /// # Contract
    /// - Checks run in order and stop at the first failure: agenda,
    ///   createdBy, attendees, attendeesLead, then dateTime.
    /// - On success `created_at` is now and `deleted` is false.
    pub fn create(&self, input: &MeetingInput) -> MeetingResult<MeetingRecord> {
        let meeting = match self.build_meeting(input) {
            Ok(meeting) => meeting,
            Err(err) => {
                warn!(
                    "event=meeting_create module=service status=rejected error_code={}",
                    err.code()
                );
                return Err(err);
            }
        };

        self.meetings.insert_meeting(&meeting)?;
        info!(
            "event=meeting_create module=service status=ok meeting_id={} attendees={} attendee_leads={}",
            meeting.id,
            meeting.attendees.len(),
            meeting.attendees_lead.len()
        );
        Ok(meeting)
    }

    /// Fetches one meeting with relations expanded, deleted or not.
    pub fn get_by_id(&self, id: &str) -> MeetingResult<MeetingDetail> {
        let id = parse_single_id(id)?;
        let meeting = self
            .meetings
            .get_meeting(id)?
            .ok_or(MeetingError::NotFound(id))?;

        Ok(MeetingDetail {
            created_by: self.identities.get_user(meeting.created_by)?,
            attendees: self.identities.get_contacts(&meeting.attendees)?,
            attendees_lead: self.identities.get_leads(&meeting.attendees_lead)?,
            id: meeting.id,
            agenda: meeting.agenda,
            location: meeting.location,
            related: meeting.related,
            date_time: meeting.date_time,
            notes: meeting.notes,
            created_at: meeting.created_at,
            deleted: meeting.deleted,
        })
    }

    /// Lists active meetings matching flat query parameters.
    pub fn list<P, K, V>(&self, params: P) -> MeetingResult<Vec<MeetingListItem>>
    where
        P: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.list_filtered(&MeetingFilter::from_params(params))
    }

    /// Lists active meetings matching a prepared filter.
    pub fn list_filtered(&self, filter: &MeetingFilter) -> MeetingResult<Vec<MeetingListItem>> {
        let items = self
            .meetings
            .list_meetings(&filter.pipeline())
            .inspect_err(|err| {
                warn!("event=meeting_list module=service status=error error={err}");
            })?;
        Ok(items)
    }

    /// Soft-deletes one active meeting and returns the updated record.
    ///
    /// Deleting an already-deleted meeting reports `NotFound`.
    pub fn delete_one(&self, id: &str) -> MeetingResult<MeetingRecord> {
        let id = parse_single_id(id)?;
        let meeting = self.meetings.soft_delete_meeting(id)?;
        info!("event=meeting_delete module=service status=ok meeting_id={id}");
        Ok(meeting)
    }

    /// Soft-deletes every meeting in `ids`, or none of them.
    ///
    /// # Contract
    /// - Any malformed id → `InvalidIdentifiers`, nothing deleted.
    /// - Any id without a stored meeting (deleted or not) →
    ///   `MissingIdentifiers`, nothing deleted.
    /// - Otherwise one batch update flips `deleted` for all of them.
    pub fn delete_many<S: AsRef<str>>(&self, ids: &[S]) -> MeetingResult<DeleteManyOutcome> {
        let invalid: Vec<String> = ids
            .iter()
            .map(AsRef::as_ref)
            .filter(|id| !is_valid_id(id))
            .map(str::to_string)
            .collect();
        if !invalid.is_empty() {
            warn!(
                "event=meeting_delete_many module=service status=rejected error_code=invalid_identifiers count={}",
                invalid.len()
            );
            return Err(MeetingError::InvalidIdentifiers(invalid));
        }

        let requested: Vec<(&str, RecordId)> = ids
            .iter()
            .map(AsRef::as_ref)
            .filter_map(|raw| parse_id(raw).map(|id| (raw, id)))
            .collect();
        let parsed: Vec<RecordId> = requested.iter().map(|(_, id)| *id).collect();

        let existing = self.meetings.find_existing_ids(&parsed)?;
        let missing: Vec<String> = requested
            .iter()
            .filter(|(_, id)| !existing.contains(id))
            .map(|(raw, _)| (*raw).to_string())
            .collect();
        if !missing.is_empty() {
            warn!(
                "event=meeting_delete_many module=service status=rejected error_code=missing_identifiers count={}",
                missing.len()
            );
            return Err(MeetingError::MissingIdentifiers(missing));
        }

        let matched = self.meetings.soft_delete_meetings(&parsed)?;
        info!(
            "event=meeting_delete_many module=service status=ok requested={} matched={matched}",
            parsed.len()
        );
        Ok(DeleteManyOutcome { matched })
    }

    fn build_meeting(&self, input: &MeetingInput) -> MeetingResult<MeetingRecord> {
        let agenda = match input.agenda.as_deref() {
            Some(agenda) if !agenda.is_empty() => agenda.to_string(),
            _ => return Err(MeetingError::MissingField(AGENDA_FIELD)),
        };

        let created_by = input
            .created_by
            .as_deref()
            .and_then(parse_id)
            .ok_or_else(|| MeetingError::InvalidReference {
                field: CREATED_BY_FIELD,
                invalid: input.created_by.iter().cloned().collect(),
            })?;

        let attendees = parse_id_collection(ATTENDEES_FIELD, input.attendees.as_ref())?;
        let attendees_lead =
            parse_id_collection(ATTENDEES_LEAD_FIELD, input.attendees_lead.as_ref())?;
        let date_time = parse_date_time(input.date_time.as_ref())?;

        if self.options.verify_references {
            self.verify_references(created_by, &attendees, &attendees_lead)?;
        }

        Ok(MeetingRecord {
            id: new_id(),
            agenda,
            attendees,
            attendees_lead,
            location: input.location.clone(),
            related: input.related.clone(),
            date_time,
            notes: input.notes.clone(),
            created_by,
            created_at: now_epoch_ms(),
            deleted: false,
        })
    }

    fn verify_references(
        &self,
        created_by: RecordId,
        attendees: &[RecordId],
        attendees_lead: &[RecordId],
    ) -> MeetingResult<()> {
        if self.identities.get_user(created_by)?.is_none() {
            return Err(MeetingError::InvalidReference {
                field: CREATED_BY_FIELD,
                invalid: vec![created_by.to_string()],
            });
        }

        let found: HashSet<RecordId> = self
            .identities
            .get_contacts(attendees)?
            .into_iter()
            .map(|contact| contact.id)
            .collect();
        reject_unresolved(ATTENDEES_FIELD, attendees, &found)?;

        let found: HashSet<RecordId> = self
            .identities
            .get_leads(attendees_lead)?
            .into_iter()
            .map(|lead| lead.id)
            .collect();
        reject_unresolved(ATTENDEES_LEAD_FIELD, attendees_lead, &found)
    }
}

fn parse_single_id(id: &str) -> MeetingResult<RecordId> {
    parse_id(id).ok_or_else(|| MeetingError::InvalidReference {
        field: ID_FIELD,
        invalid: vec![id.to_string()],
    })
}

/// Parses an optional id collection, keeping first occurrences in order.
fn parse_id_collection(field: &'static str, value: Option<&Value>) -> MeetingResult<Vec<RecordId>> {
    let items = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(MeetingError::InvalidReference {
                field,
                invalid: vec![other.to_string()],
            });
        }
    };

    let mut ids = Vec::with_capacity(items.len());
    let mut invalid = Vec::new();
    for item in items {
        match item.as_str().and_then(parse_id) {
            Some(id) if !ids.contains(&id) => ids.push(id),
            Some(_) => {}
            None => invalid.push(item.as_str().map_or_else(|| item.to_string(), str::to_string)),
        }
    }

    if invalid.is_empty() {
        Ok(ids)
    } else {
        Err(MeetingError::InvalidReference { field, invalid })
    }
}

fn parse_date_time(value: Option<&Value>) -> MeetingResult<Option<EpochMillis>> {
    let invalid = |message: String| MeetingError::InvalidField {
        field: DATE_TIME_FIELD,
        message,
    };

    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => number
            .as_i64()
            .map(Some)
            .ok_or_else(|| invalid(format!("`{number}` is not an integer epoch timestamp"))),
        Some(Value::String(text)) => coerce_timestamp(text)
            .map(Some)
            .ok_or_else(|| invalid(format!("cannot coerce `{text}` to a date"))),
        Some(other) => Err(invalid(format!("unsupported value `{other}`"))),
    }
}

fn reject_unresolved(
    field: &'static str,
    requested: &[RecordId],
    found: &HashSet<RecordId>,
) -> MeetingResult<()> {
    let unresolved: Vec<String> = requested
        .iter()
        .filter(|id| !found.contains(id))
        .map(ToString::to_string)
        .collect();
    if unresolved.is_empty() {
        Ok(())
    } else {
        Err(MeetingError::InvalidReference {
            field,
            invalid: unresolved,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_date_time, parse_id_collection, MeetingError};
    use crate::model::id::new_id;
    use serde_json::json;

    #[test]
    fn id_collection_rejects_non_arrays_and_lists_bad_entries() {
        let err = parse_id_collection("attendees", Some(&json!("abc"))).unwrap_err();
        assert!(matches!(
            err,
            MeetingError::InvalidReference { field: "attendees", ref invalid } if invalid == &vec!["\"abc\"".to_string()]
        ));

        let good = new_id().to_string();
        let err =
            parse_id_collection("attendeesLead", Some(&json!([good, "nope", 7]))).unwrap_err();
        match err {
            MeetingError::InvalidReference { field, invalid } => {
                assert_eq!(field, "attendeesLead");
                assert_eq!(invalid, vec!["nope".to_string(), "7".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn id_collection_treats_null_as_absent_and_dedupes() {
        assert!(parse_id_collection("attendees", Some(&json!(null)))
            .unwrap()
            .is_empty());

        let id = new_id();
        let ids =
            parse_id_collection("attendees", Some(&json!([id.to_string(), id.simple().to_string()])))
                .unwrap();
        assert_eq!(ids, vec![id]);
    }

    #[test]
    fn date_time_accepts_text_and_epoch_millis() {
        assert_eq!(
            parse_date_time(Some(&json!("2024-06-01"))).unwrap(),
            Some(1_717_200_000_000)
        );
        assert_eq!(parse_date_time(Some(&json!(42))).unwrap(), Some(42));
        assert!(matches!(
            parse_date_time(Some(&json!("soon"))),
            Err(MeetingError::InvalidField { field: "dateTime", .. })
        ));
    }

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(MeetingError::MissingField("agenda").status_code(), 400);
        assert_eq!(MeetingError::InvalidIdentifiers(vec![]).status_code(), 400);
        assert_eq!(MeetingError::MissingIdentifiers(vec![]).status_code(), 404);
        assert_eq!(MeetingError::NotFound(new_id()).status_code(), 404);
    }

    #[test]
    fn payload_lists_offending_ids() {
        let payload = MeetingError::InvalidIdentifiers(vec!["bad".to_string()]).to_payload();
        assert_eq!(payload["invalidIds"], json!(["bad"]));
        assert_eq!(payload["code"], json!("invalid_identifiers"));

        let payload = MeetingError::MissingIdentifiers(vec!["gone".to_string()]).to_payload();
        assert_eq!(payload["missingIds"], json!(["gone"]));
    }
}
