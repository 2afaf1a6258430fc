//! Domain model for meetings and the identities they reference.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Own identifier and timestamp conventions.
//!
//! # Invariants
//! - Every record is identified by a stable `RecordId`.
//! - Deletion is represented by soft-delete tombstones, not hard delete.

pub mod id;
pub mod identity;
pub mod meeting;
pub mod timestamp;
