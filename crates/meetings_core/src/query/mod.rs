//! List-path query construction.
//!
//! # Responsibility
//! - Translate flat caller parameters into a structured meeting filter.
//! - Describe the list path as an ordered pipeline of stages.
//!
//! # Invariants
//! - Every pipeline starts with a match stage that excludes deleted records.
//! - Creator-login filtering always runs after the creator join.
//! - Nothing here touches the store; compilation to SQL lives in `repo`.

pub mod filter;
pub mod pipeline;
