//! Read access to users, contacts and leads.
//!
//! # Responsibility
//! - Resolve meeting references into full identity records for expansion.
//! - Offer existence checks for the stricter write-time reference mode.
//!
//! # Invariants
//! - The trait surface is read-only; identities are owned by the CRM.
//! - Batch lookups preserve caller order and skip ids that do not resolve.

use crate::model::id::RecordId;
use crate::model::identity::{Contact, Lead, User};
use crate::repo::meeting_repo::{parse_stored_id, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Repository interface for identity lookups.
pub trait IdentityRepository {
    fn get_user(&self, id: RecordId) -> RepoResult<Option<User>>;
    /// Returns resolvable contacts in the order of `ids`.
    fn get_contacts(&self, ids: &[RecordId]) -> RepoResult<Vec<Contact>>;
    /// Returns resolvable leads in the order of `ids`.
    fn get_leads(&self, ids: &[RecordId]) -> RepoResult<Vec<Lead>>;
}

/// SQLite-backed identity repository.
pub struct SqliteIdentityRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteIdentityRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Inserts or replaces a user. Used by import and fixture paths.
    pub fn upsert_user(&self, user: &User) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO users (id, username, first_name, last_name)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (id) DO UPDATE SET
                username = excluded.username,
                first_name = excluded.first_name,
                last_name = excluded.last_name;",
            params![
                user.id.to_string(),
                user.username.as_str(),
                user.first_name.as_deref(),
                user.last_name.as_deref(),
            ],
        )?;
        Ok(())
    }

    /// Inserts or replaces a contact. Used by import and fixture paths.
    pub fn upsert_contact(&self, contact: &Contact) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO contacts (id, full_name, email, phone)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (id) DO UPDATE SET
                full_name = excluded.full_name,
                email = excluded.email,
                phone = excluded.phone;",
            params![
                contact.id.to_string(),
                contact.full_name.as_str(),
                contact.email.as_deref(),
                contact.phone.as_deref(),
            ],
        )?;
        Ok(())
    }

    /// Inserts or replaces a lead. Used by import and fixture paths.
    pub fn upsert_lead(&self, lead: &Lead) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO leads (id, lead_name, lead_email, lead_phone)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (id) DO UPDATE SET
                lead_name = excluded.lead_name,
                lead_email = excluded.lead_email,
                lead_phone = excluded.lead_phone;",
            params![
                lead.id.to_string(),
                lead.lead_name.as_str(),
                lead.lead_email.as_deref(),
                lead.lead_phone.as_deref(),
            ],
        )?;
        Ok(())
    }
}

impl IdentityRepository for SqliteIdentityRepository<'_> {
    fn get_user(&self, id: RecordId) -> RepoResult<Option<User>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, username, first_name, last_name
                 FROM users
                 WHERE id = ?1;",
                [id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>("id")?,
                        row.get::<_, String>("username")?,
                        row.get::<_, Option<String>>("first_name")?,
                        row.get::<_, Option<String>>("last_name")?,
                    ))
                },
            )
            .optional()?;

        let Some((id_text, username, first_name, last_name)) = row else {
            return Ok(None);
        };
        Ok(Some(User {
            id: parse_stored_id(&id_text, "users.id")?,
            username,
            first_name,
            last_name,
        }))
    }

    fn get_contacts(&self, ids: &[RecordId]) -> RepoResult<Vec<Contact>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, full_name, email, phone
             FROM contacts
             WHERE id = ?1;",
        )?;
        let mut contacts = Vec::with_capacity(ids.len());
        for id in ids {
            let mut rows = stmt.query([id.to_string()])?;
            if let Some(row) = rows.next()? {
                contacts.push(parse_contact_row(row)?);
            }
        }
        Ok(contacts)
    }

    fn get_leads(&self, ids: &[RecordId]) -> RepoResult<Vec<Lead>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, lead_name, lead_email, lead_phone
             FROM leads
             WHERE id = ?1;",
        )?;
        let mut leads = Vec::with_capacity(ids.len());
        for id in ids {
            let mut rows = stmt.query([id.to_string()])?;
            if let Some(row) = rows.next()? {
                leads.push(parse_lead_row(row)?);
            }
        }
        Ok(leads)
    }
}

fn parse_contact_row(row: &Row<'_>) -> RepoResult<Contact> {
    let id_text: String = row.get("id")?;
    Ok(Contact {
        id: parse_stored_id(&id_text, "contacts.id")?,
        full_name: row.get("full_name")?,
        email: row.get("email")?,
        phone: row.get("phone")?,
    })
}

fn parse_lead_row(row: &Row<'_>) -> RepoResult<Lead> {
    let id_text: String = row.get("id")?;
    Ok(Lead {
        id: parse_stored_id(&id_text, "leads.id")?,
        lead_name: row.get("lead_name")?,
        lead_email: row.get("lead_email")?,
        lead_phone: row.get("lead_phone")?,
    })
}
