//! Meeting repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist meetings together with their attendee relationship rows.
//! - Compile list pipelines into a single SQL statement.
//! - Perform single and batch soft-delete updates.
//!
//! # Invariants
//! - Write paths must call `MeetingRecord::validate()` before SQL mutations.
//! - Read paths must reject invalid persisted state instead of masking it.
//! - No statement here ever clears `deleted`.

use crate::db::DbError;
use crate::model::id::{parse_id, RecordId};
use crate::model::meeting::{MeetingListItem, MeetingRecord, MeetingValidationError};
use crate::query::filter::{DateRange, FieldEquals, StoredField};
use crate::query::pipeline::{ListPipeline, MatchPredicate, Stage};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

const MEETING_COLUMNS_SQL: &str = "m.id,
    m.agenda,
    m.location,
    m.related,
    m.date_time,
    m.notes,
    m.created_by,
    m.created_at,
    m.deleted";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for meeting and identity persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(MeetingValidationError),
    Db(DbError),
    NotFound(RecordId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "meeting not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<MeetingValidationError> for RepoError {
    fn from(value: MeetingValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for meeting persistence.
pub trait MeetingRepository {
    /// Stores a new meeting and its attendee rows atomically.
    fn insert_meeting(&self, meeting: &MeetingRecord) -> RepoResult<()>;
    /// Loads one meeting regardless of its `deleted` state.
    fn get_meeting(&self, id: RecordId) -> RepoResult<Option<MeetingRecord>>;
    /// Runs a list pipeline; deleted meetings are never returned.
    fn list_meetings(&self, pipeline: &ListPipeline) -> RepoResult<Vec<MeetingListItem>>;
    /// Flips one active meeting to deleted and returns the updated record.
    ///
    /// Returns `NotFound` when no active meeting has this id.
    fn soft_delete_meeting(&self, id: RecordId) -> RepoResult<MeetingRecord>;
    /// Returns which of `ids` exist, deleted or not.
    fn find_existing_ids(&self, ids: &[RecordId]) -> RepoResult<HashSet<RecordId>>;
    /// Marks every meeting in `ids` deleted in one statement.
    ///
    /// Returns the number of matched rows. Already-deleted rows still count.
    fn soft_delete_meetings(&self, ids: &[RecordId]) -> RepoResult<usize>;
}

/// SQLite-backed meeting repository.
pub struct SqliteMeetingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMeetingRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn load_relations(&self, meeting: &mut MeetingRecord) -> RepoResult<()> {
        let meeting_id = meeting.id.to_string();
        meeting.attendees = load_relation_ids(
            self.conn,
            "SELECT contact_id FROM meeting_attendees
             WHERE meeting_id = ?1
             ORDER BY position ASC;",
            &meeting_id,
            "meeting_attendees.contact_id",
        )?;
        meeting.attendees_lead = load_relation_ids(
            self.conn,
            "SELECT lead_id FROM meeting_attendee_leads
             WHERE meeting_id = ?1
             ORDER BY position ASC;",
            &meeting_id,
            "meeting_attendee_leads.lead_id",
        )?;
        meeting.validate()?;
        Ok(())
    }
}

impl MeetingRepository for SqliteMeetingRepository<'_> {
    fn insert_meeting(&self, meeting: &MeetingRecord) -> RepoResult<()> {
        meeting.validate()?;

        let meeting_id = meeting.id.to_string();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO meetings (
                id,
                agenda,
                location,
                related,
                date_time,
                notes,
                created_by,
                created_at,
                deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                meeting_id.as_str(),
                meeting.agenda.as_str(),
                meeting.location.as_deref(),
                meeting.related.as_deref(),
                meeting.date_time,
                meeting.notes.as_deref(),
                meeting.created_by.to_string(),
                meeting.created_at,
                bool_to_int(meeting.deleted),
            ],
        )?;

        for (position, contact_id) in meeting.attendees.iter().enumerate() {
            tx.execute(
                "INSERT INTO meeting_attendees (meeting_id, contact_id, position)
                 VALUES (?1, ?2, ?3);",
                params![meeting_id.as_str(), contact_id.to_string(), position as i64],
            )?;
        }
        for (position, lead_id) in meeting.attendees_lead.iter().enumerate() {
            tx.execute(
                "INSERT INTO meeting_attendee_leads (meeting_id, lead_id, position)
                 VALUES (?1, ?2, ?3);",
                params![meeting_id.as_str(), lead_id.to_string(), position as i64],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn get_meeting(&self, id: RecordId) -> RepoResult<Option<MeetingRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MEETING_COLUMNS_SQL}
             FROM meetings m
             WHERE m.id = ?1;"
        ))?;

        let mut rows = stmt.query([id.to_string()])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let mut meeting = parse_meeting_row(row)?;
        self.load_relations(&mut meeting)?;
        Ok(Some(meeting))
    }

    fn list_meetings(&self, pipeline: &ListPipeline) -> RepoResult<Vec<MeetingListItem>> {
        let compiled = compile_pipeline(pipeline);

        let mut stmt = self.conn.prepare(&compiled.sql)?;
        let mut rows = stmt.query(params_from_iter(compiled.bind_values))?;
        let mut items = Vec::new();

        while let Some(row) = rows.next()? {
            let mut meeting = parse_meeting_row(row)?;
            self.load_relations(&mut meeting)?;
            items.push(MeetingListItem {
                meeting,
                created_by_email: row.get("creator_login")?,
            });
        }

        Ok(items)
    }

    fn soft_delete_meeting(&self, id: RecordId) -> RepoResult<MeetingRecord> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE meetings
             SET deleted = 1
             WHERE id = ?1
               AND deleted = 0;",
            [id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        let meeting = self.get_meeting(id)?.ok_or(RepoError::NotFound(id))?;
        tx.commit()?;
        Ok(meeting)
    }

    fn find_existing_ids(&self, ids: &[RecordId]) -> RepoResult<HashSet<RecordId>> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM meetings
             WHERE id IN (SELECT value FROM json_each(?1));",
        )?;
        let mut rows = stmt.query([ids_to_json(ids)])?;
        let mut existing = HashSet::new();

        while let Some(row) = rows.next()? {
            let id_text: String = row.get(0)?;
            existing.insert(parse_stored_id(&id_text, "meetings.id")?);
        }

        Ok(existing)
    }

    fn soft_delete_meetings(&self, ids: &[RecordId]) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE meetings
             SET deleted = 1
             WHERE id IN (SELECT value FROM json_each(?1));",
            [ids_to_json(ids)],
        )?;
        Ok(changed)
    }
}

/// SQL text plus positional bind values for one list query.
#[derive(Debug)]
struct CompiledQuery {
    sql: String,
    bind_values: Vec<Value>,
}

fn compile_pipeline(pipeline: &ListPipeline) -> CompiledQuery {
    let mut joins_creator = false;
    let mut projects_creator = false;
    let mut conditions = vec!["m.deleted = 0".to_string()];
    let mut bind_values = Vec::new();

    for stage in pipeline.stages() {
        match stage {
            Stage::Match(predicate) => {
                push_match_conditions(predicate, &mut conditions, &mut bind_values);
            }
            Stage::JoinCreator => joins_creator = true,
            Stage::MatchCreatorLogin(login) => {
                // Without the join there is no login to match against.
                if joins_creator {
                    conditions.push("ci_contains(creator.username, ?)".to_string());
                    bind_values.push(Value::Text(login.clone()));
                } else {
                    conditions.push("0 = 1".to_string());
                }
            }
            Stage::MatchAgenda(agenda) => {
                conditions.push("ci_contains(m.agenda, ?)".to_string());
                bind_values.push(Value::Text(agenda.clone()));
            }
            Stage::ProjectCreatorLogin => projects_creator = joins_creator,
        }
    }

    let creator_column = if projects_creator {
        "creator.username"
    } else {
        "NULL"
    };
    let join_sql = if joins_creator {
        " LEFT JOIN users creator ON creator.id = m.created_by"
    } else {
        ""
    };

    let sql = format!(
        "SELECT {MEETING_COLUMNS_SQL}, {creator_column} AS creator_login
         FROM meetings m{join_sql}
         WHERE {}
         ORDER BY m.rowid ASC;",
        conditions.join(" AND ")
    );

    CompiledQuery { sql, bind_values }
}

fn push_match_conditions(
    predicate: &MatchPredicate,
    conditions: &mut Vec<String>,
    bind_values: &mut Vec<Value>,
) {
    for clause in &predicate.equals {
        push_equals_condition(clause, conditions, bind_values);
    }
    push_range_conditions("m.date_time", &predicate.date_time, conditions, bind_values);
    push_range_conditions("m.created_at", &predicate.created_at, conditions, bind_values);
}

fn push_equals_condition(
    clause: &FieldEquals,
    conditions: &mut Vec<String>,
    bind_values: &mut Vec<Value>,
) {
    let Some(field) = clause.field else {
        // No meeting stores this field, so equality can never hold.
        conditions.push("0 = 1".to_string());
        return;
    };

    let value = clause.value.clone();
    let (condition, bound) = match field {
        StoredField::Id => ("m.id = ?", Value::Text(normalize_id_text(value))),
        StoredField::CreatedBy => ("m.created_by = ?", Value::Text(normalize_id_text(value))),
        StoredField::Location => ("m.location = ?", Value::Text(value)),
        StoredField::Notes => ("m.notes = ?", Value::Text(value)),
        StoredField::Related => ("m.related = ?", Value::Text(value)),
        StoredField::DateTime => ("m.date_time = coerce_date(?)", Value::Text(value)),
        StoredField::CreatedAt => ("m.created_at = coerce_date(?)", Value::Text(value)),
        StoredField::Deleted => match value.as_str() {
            "true" => ("m.deleted = ?", Value::Integer(1)),
            "false" => ("m.deleted = ?", Value::Integer(0)),
            // Integer affinity would coerce text like `0`; only booleans compare.
            _ => {
                conditions.push("0 = 1".to_string());
                return;
            }
        },
        StoredField::Attendees => (
            "EXISTS (
                SELECT 1 FROM meeting_attendees a
                WHERE a.meeting_id = m.id AND a.contact_id = ?
            )",
            Value::Text(normalize_id_text(value)),
        ),
        StoredField::AttendeesLead => (
            "EXISTS (
                SELECT 1 FROM meeting_attendee_leads al
                WHERE al.meeting_id = m.id AND al.lead_id = ?
            )",
            Value::Text(normalize_id_text(value)),
        ),
    };

    conditions.push(condition.to_string());
    bind_values.push(bound);
}

fn push_range_conditions(
    column: &str,
    range: &DateRange,
    conditions: &mut Vec<String>,
    bind_values: &mut Vec<Value>,
) {
    if let Some(from) = &range.from {
        conditions.push(format!("{column} >= coerce_date(?)"));
        bind_values.push(Value::Text(from.clone()));
    }
    if let Some(to) = &range.to {
        conditions.push(format!("{column} <= coerce_date(?)"));
        bind_values.push(Value::Text(to.clone()));
    }
}

/// Identifier text in stored form, or the raw text when it is not an id.
fn normalize_id_text(value: String) -> String {
    match parse_id(&value) {
        Some(id) => id.to_string(),
        None => value,
    }
}

fn ids_to_json(ids: &[RecordId]) -> String {
    serde_json::Value::from(ids.iter().map(ToString::to_string).collect::<Vec<_>>()).to_string()
}

fn parse_meeting_row(row: &Row<'_>) -> RepoResult<MeetingRecord> {
    let id_text: String = row.get("id")?;
    let created_by_text: String = row.get("created_by")?;

    let deleted = match row.get::<_, i64>("deleted")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid deleted value `{other}` in meetings.deleted"
            )));
        }
    };

    Ok(MeetingRecord {
        id: parse_stored_id(&id_text, "meetings.id")?,
        agenda: row.get("agenda")?,
        attendees: Vec::new(),
        attendees_lead: Vec::new(),
        location: row.get("location")?,
        related: row.get("related")?,
        date_time: row.get("date_time")?,
        notes: row.get("notes")?,
        created_by: parse_stored_id(&created_by_text, "meetings.created_by")?,
        created_at: row.get("created_at")?,
        deleted,
    })
}

fn load_relation_ids(
    conn: &Connection,
    sql: &str,
    meeting_id: &str,
    column: &str,
) -> RepoResult<Vec<RecordId>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let mut rows = stmt.query([meeting_id])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        ids.push(parse_stored_id(&value, column)?);
    }
    Ok(ids)
}

pub(crate) fn parse_stored_id(value: &str, column: &str) -> RepoResult<RecordId> {
    parse_id(value)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid id value `{value}` in {column}")))
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
