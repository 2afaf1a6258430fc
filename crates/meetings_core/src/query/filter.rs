//! Filter builder for meeting listings.
//!
//! # Responsibility
//! - Recognize the special list parameters (`createBy`, `agenda`, date bounds).
//! - Pass every other parameter through as an exact-match field clause.
//!
//! # Invariants
//! - Blank special parameters are treated as absent.
//! - Date text is kept verbatim; coercion is left to the store.
//! - Pass-through clauses can only narrow results; they never lift the
//!   `deleted == false` base condition.

use crate::query::pipeline::{ListPipeline, MatchPredicate, Stage};

pub const CREATOR_LOGIN_PARAM: &str = "createBy";
pub const AGENDA_PARAM: &str = "agenda";
pub const DATE_TIME_FROM_PARAM: &str = "dateTimeFrom";
pub const DATE_TIME_TO_PARAM: &str = "dateTimeTo";
pub const TIMESTAMP_FROM_PARAM: &str = "timestampFrom";
pub const TIMESTAMP_TO_PARAM: &str = "timestampTo";

/// Stored meeting fields addressable through pass-through parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredField {
    Id,
    Location,
    Notes,
    Related,
    CreatedBy,
    DateTime,
    CreatedAt,
    Deleted,
    Attendees,
    AttendeesLead,
}

impl StoredField {
    /// Resolves a parameter name to the stored field it addresses.
    pub fn from_param(name: &str) -> Option<Self> {
        let field = match name {
            "id" | "_id" => Self::Id,
            "location" => Self::Location,
            "notes" => Self::Notes,
            "related" => Self::Related,
            "createdBy" => Self::CreatedBy,
            "dateTime" => Self::DateTime,
            "createdAt" | "timestamp" => Self::CreatedAt,
            "deleted" => Self::Deleted,
            "attendees" => Self::Attendees,
            "attendeesLead" => Self::AttendeesLead,
            _ => return None,
        };
        Some(field)
    }
}

/// One exact-match clause taken verbatim from the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEquals {
    /// Parameter name as received.
    pub name: String,
    /// `None` when no meeting stores a field by that name.
    pub field: Option<StoredField>,
    pub value: String,
}

/// Inclusive date bounds; a missing side is open-ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl DateRange {
    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

/// Structured form of the list parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeetingFilter {
    /// Case-insensitive substring of the joined creator login.
    pub creator_login: Option<String>,
    /// Trimmed case-insensitive substring of the agenda.
    pub agenda: Option<String>,
    /// Bounds on the scheduled `dateTime`.
    pub date_time: DateRange,
    /// Bounds on the system `createdAt`.
    pub created_at: DateRange,
    /// Pass-through equality clauses in input order.
    pub equals: Vec<FieldEquals>,
}

impl MeetingFilter {
    /// Builds a filter from flat query parameters.
    ///
    /// Recognized keys are consumed (last occurrence wins); every other pair
    /// becomes a [`FieldEquals`] clause.
    pub fn from_params<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut filter = Self::default();

        for (key, value) in params {
            let key = key.into();
            let value = value.into();
            match key.as_str() {
                CREATOR_LOGIN_PARAM => filter.creator_login = non_empty(value),
                AGENDA_PARAM => filter.agenda = non_blank_trimmed(&value),
                DATE_TIME_FROM_PARAM => filter.date_time.from = non_empty(value),
                DATE_TIME_TO_PARAM => filter.date_time.to = non_empty(value),
                TIMESTAMP_FROM_PARAM => filter.created_at.from = non_empty(value),
                TIMESTAMP_TO_PARAM => filter.created_at.to = non_empty(value),
                _ => filter.equals.push(FieldEquals {
                    field: StoredField::from_param(&key),
                    name: key,
                    value,
                }),
            }
        }

        filter
    }

    /// Expands the filter into the ordered list pipeline.
    pub fn pipeline(&self) -> ListPipeline {
        let mut stages = vec![
            Stage::Match(MatchPredicate {
                equals: self.equals.clone(),
                date_time: self.date_time.clone(),
                created_at: self.created_at.clone(),
            }),
            Stage::JoinCreator,
        ];

        if let Some(login) = &self.creator_login {
            stages.push(Stage::MatchCreatorLogin(login.clone()));
        }
        if let Some(agenda) = &self.agenda {
            stages.push(Stage::MatchAgenda(agenda.clone()));
        }
        stages.push(Stage::ProjectCreatorLogin);

        ListPipeline::new(stages)
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn non_blank_trimmed(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{DateRange, FieldEquals, MeetingFilter, StoredField};
    use crate::query::pipeline::Stage;

    #[test]
    fn recognized_keys_are_consumed_and_rest_pass_through() {
        let filter = MeetingFilter::from_params([
            ("createBy", "alice"),
            ("agenda", "  review "),
            ("dateTimeFrom", "2024-01-01"),
            ("timestampTo", "2024-12-31"),
            ("location", "Room 4"),
            ("page", "2"),
        ]);

        assert_eq!(filter.creator_login.as_deref(), Some("alice"));
        assert_eq!(filter.agenda.as_deref(), Some("review"));
        assert_eq!(
            filter.date_time,
            DateRange {
                from: Some("2024-01-01".to_string()),
                to: None,
            }
        );
        assert_eq!(filter.created_at.to.as_deref(), Some("2024-12-31"));
        assert!(filter.created_at.from.is_none());
        assert_eq!(
            filter.equals,
            vec![
                FieldEquals {
                    name: "location".to_string(),
                    field: Some(StoredField::Location),
                    value: "Room 4".to_string(),
                },
                FieldEquals {
                    name: "page".to_string(),
                    field: None,
                    value: "2".to_string(),
                },
            ]
        );
    }

    #[test]
    fn blank_special_values_are_absent() {
        let filter = MeetingFilter::from_params([
            ("agenda", "   "),
            ("createBy", ""),
            ("dateTimeTo", ""),
        ]);
        assert!(filter.agenda.is_none());
        assert!(filter.creator_login.is_none());
        assert!(filter.date_time.is_unbounded());
        assert!(filter.equals.is_empty());
    }

    #[test]
    fn pipeline_joins_before_creator_match_and_projects_last() {
        let filter = MeetingFilter::from_params([("createBy", "bob"), ("agenda", "plan")]);
        let stages = filter.pipeline().stages().to_vec();

        assert!(matches!(stages[0], Stage::Match(_)));
        assert_eq!(stages[1], Stage::JoinCreator);
        assert_eq!(stages[2], Stage::MatchCreatorLogin("bob".to_string()));
        assert_eq!(stages[3], Stage::MatchAgenda("plan".to_string()));
        assert_eq!(stages[4], Stage::ProjectCreatorLogin);
    }

    #[test]
    fn empty_filter_still_matches_joins_and_projects() {
        let pipeline = MeetingFilter::default().pipeline();
        assert_eq!(pipeline.stages().len(), 3);
        assert!(!pipeline.filters_on_creator());
    }
}
