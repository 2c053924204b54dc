//! Booking form validation.

use crate::error::{Field, FieldError, ValidationErrors};
use crate::types::{BookingDraft, Recipient, SkillLevel, ValidatedDraft};
use chrono::{NaiveDate, NaiveTime};

const REQUIRED: [Field; 6] = [
    Field::Name,
    Field::Email,
    Field::Phone,
    Field::Date,
    Field::Time,
    Field::SkillLevel,
];

/// Validates booking drafts
///
/// Pure: validating the same draft twice yields the same result.
#[derive(Clone, Copy, Debug, Default)]
pub struct BookingDraftCollector;

impl BookingDraftCollector {
    /// Create a collector
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Check every field and either freeze the draft or report all problems
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErrors`] listing every missing or malformed field.
    pub fn validate(&self, draft: &BookingDraft) -> Result<ValidatedDraft, ValidationErrors> {
        let mut errors = Vec::new();

        for field in REQUIRED {
            if draft.get(field).trim().is_empty() {
                errors.push(FieldError::Missing(field));
            }
        }

        let email = draft.email.trim();
        if !email.is_empty() && !looks_like_email(email) {
            errors.push(malformed(Field::Email, "expected name@domain"));
        }

        let date = parse_present(&draft.date, Field::Date, &mut errors, |s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| "expected YYYY-MM-DD")
        });
        let time = parse_present(&draft.time, Field::Time, &mut errors, |s| {
            NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| "expected HH:MM")
        });
        let skill_level = parse_present(&draft.skill_level, Field::SkillLevel, &mut errors, |s| {
            s.parse::<SkillLevel>()
                .map_err(|_| "expected beginner, intermediate or advanced")
        });

        match (date, time, skill_level) {
            (Some(date), Some(time), Some(skill_level)) if errors.is_empty() => {
                let comments = draft.comments.trim();
                Ok(ValidatedDraft {
                    contact: Recipient {
                        name: draft.name.trim().to_string(),
                        email: email.to_string(),
                        phone: draft.phone.trim().to_string(),
                    },
                    date,
                    time,
                    skill_level,
                    comments: (!comments.is_empty()).then(|| comments.to_string()),
                })
            },
            _ => Err(ValidationErrors(errors)),
        }
    }
}

fn malformed(field: Field, reason: &str) -> FieldError {
    FieldError::Malformed {
        field,
        reason: reason.to_string(),
    }
}

fn looks_like_email(email: &str) -> bool {
    email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty() && !domain.contains('@'))
}

/// Parse a field that is present; missing fields were already reported.
fn parse_present<T>(
    raw: &str,
    field: Field,
    errors: &mut Vec<FieldError>,
    parse: impl FnOnce(&str) -> Result<T, &'static str>,
) -> Option<T> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match parse(raw) {
        Ok(value) => Some(value),
        Err(reason) => {
            errors.push(malformed(field, reason));
            None
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ana() -> BookingDraft {
        BookingDraft {
            name: "Ana".to_string(),
            email: "ana@x.com".to_string(),
            phone: "999".to_string(),
            date: "2025-11-05".to_string(),
            time: "08:00".to_string(),
            skill_level: "intermediate".to_string(),
            comments: String::new(),
        }
    }

    #[test]
    fn valid_draft_freezes() {
        let validated = BookingDraftCollector::new().validate(&ana()).unwrap();
        assert_eq!(validated.skill_level(), SkillLevel::Intermediate);
        assert_eq!(validated.contact().email, "ana@x.com");
        assert_eq!(validated.comments(), None);
        assert_eq!(validated.to_draft(), ana());
    }

    #[test]
    fn validate_is_idempotent() {
        let collector = BookingDraftCollector::new();
        let draft = ana();
        assert_eq!(collector.validate(&draft), collector.validate(&draft));
    }

    #[test]
    fn collects_every_missing_field() {
        let errors = BookingDraftCollector::new()
            .validate(&BookingDraft::default())
            .unwrap_err();
        assert_eq!(errors.len(), 6);
        assert!(!errors.has(Field::Comments));
    }

    #[test]
    fn whitespace_counts_as_missing() {
        let mut draft = ana();
        draft.name = "   ".to_string();
        let errors = BookingDraftCollector::new().validate(&draft).unwrap_err();
        assert_eq!(errors.0, vec![FieldError::Missing(Field::Name)]);
    }

    #[test]
    fn malformed_fields_reported_together() {
        let mut draft = ana();
        draft.email = "ana.x.com".to_string();
        draft.date = "05/11/2025".to_string();
        draft.time = "8am".to_string();
        draft.skill_level = "pro".to_string();
        let errors = BookingDraftCollector::new().validate(&draft).unwrap_err();
        assert_eq!(errors.len(), 4);
        for field in [Field::Email, Field::Date, Field::Time, Field::SkillLevel] {
            assert!(errors.has(field), "{field} should be flagged");
        }
    }

    #[test]
    fn comments_are_kept() {
        let mut draft = ana();
        draft.comments = " first time in Máncora ".to_string();
        let validated = BookingDraftCollector::new().validate(&draft).unwrap();
        assert_eq!(validated.comments(), Some("first time in Máncora"));
    }
}
