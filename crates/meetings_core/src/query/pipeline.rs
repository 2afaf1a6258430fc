//! Ordered stages of the meeting list path.

use crate::query::filter::{DateRange, FieldEquals};

/// First-stage predicate over stored meeting fields.
///
/// `deleted == false` is implied and cannot be switched off.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchPredicate {
    pub equals: Vec<FieldEquals>,
    pub date_time: DateRange,
    pub created_at: DateRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Base predicate on the meeting record itself.
    Match(MatchPredicate),
    /// Left join to the creator's user record; at most one row per meeting.
    JoinCreator,
    /// Case-insensitive substring on the joined creator login.
    MatchCreatorLogin(String),
    /// Case-insensitive substring on the agenda.
    MatchAgenda(String),
    /// Inline the creator login and drop the joined user.
    ProjectCreatorLogin,
}

/// Ordered list-path stages, built by
/// [`MeetingFilter::pipeline`](crate::query::filter::MeetingFilter::pipeline).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPipeline {
    stages: Vec<Stage>,
}

impl ListPipeline {
    pub(crate) fn new(stages: Vec<Stage>) -> Self {
        debug_assert!(matches!(stages.first(), Some(Stage::Match(_))));
        debug_assert!(stages
            .iter()
            .position(|stage| matches!(stage, Stage::MatchCreatorLogin(_)))
            .map_or(true, |creator_match| stages
                .iter()
                .position(|stage| *stage == Stage::JoinCreator)
                .is_some_and(|join| join < creator_match)));
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn filters_on_creator(&self) -> bool {
        self.stages
            .iter()
            .any(|stage| matches!(stage, Stage::MatchCreatorLogin(_)))
    }
}
