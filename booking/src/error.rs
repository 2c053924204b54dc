//! Error types for the booking domain.
//!
//! Every failure here is recoverable: the caller corrects input, retries or
//! is redirected. None of them halts the process.

use crate::types::BookingId;
use std::fmt;
use thiserror::Error;

/// A field of the booking form
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Field {
    /// Attendee name
    Name,
    /// Contact email
    Email,
    /// Contact phone
    Phone,
    /// Class date (`YYYY-MM-DD`)
    Date,
    /// Class start time (`HH:MM`)
    Time,
    /// Skill level
    SkillLevel,
    /// Free-form comments
    Comments,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Date => "date",
            Self::Time => "time",
            Self::SkillLevel => "skill level",
            Self::Comments => "comments",
        };
        f.write_str(name)
    }
}

/// A single problem with a form field
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// Required field left empty
    #[error("{0} is required")]
    Missing(Field),

    /// Field present but not in the expected shape
    #[error("{field} is invalid: {reason}")]
    Malformed {
        /// Which field
        field: Field,
        /// What is wrong with it
        reason: String,
    },
}

impl FieldError {
    /// The field this error refers to
    #[must_use]
    pub const fn field(&self) -> Field {
        match self {
            Self::Missing(field) | Self::Malformed { field, .. } => *field,
        }
    }
}

/// All problems found in one validation pass
#[derive(Debug, Error, Clone, PartialEq, Eq, Default)]
#[error("{} field(s) need attention", .0.len())]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    /// True if `field` has at least one error
    #[must_use]
    pub fn has(&self, field: Field) -> bool {
        self.0.iter().any(|e| e.field() == field)
    }

    /// Number of errors
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if there are no errors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Human readable summary, one error per line
    #[must_use]
    pub fn summary(&self) -> String {
        self.0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Skill level string outside the closed set
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown skill level: {0:?}")]
pub struct UnknownSkillLevel(pub String);

/// Authentication and registration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Password and confirmation differ
    #[error("passwords do not match")]
    PasswordMismatch,

    /// Password shorter than the minimum
    #[error("password too short (minimum {min} characters)")]
    PasswordTooShort {
        /// Minimum accepted length
        min: usize,
    },

    /// Registration without an experience level
    #[error("please select your skill level")]
    MissingSkillLevel,

    /// A required registration or login field is empty
    #[error("{0} is required")]
    MissingField(&'static str),

    /// The backend rejected the credentials
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The session store failed
    #[error("session store error: {0}")]
    Store(String),
}

/// Entry into the booking workflow without a session
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("sign in to book a class")]
pub struct AccessDenied;

/// Settlement failures reported by a payment gateway
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettlementError {
    /// The provider declined the payment
    #[error("payment declined: {0}")]
    Declined(String),

    /// The provider did not answer in time
    #[error("payment provider timed out")]
    Timeout,

    /// Any other provider failure
    #[error("payment failed: {0}")]
    Other(String),
}

/// Errors from the booking lifecycle manager
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// No upcoming booking with this id
    #[error("booking {0} not found")]
    NotFound(BookingId),

    /// The lifecycle store is not accepting requests
    #[error("booking store unavailable: {0}")]
    Unavailable(String),
}

/// Last recoverable error recorded by the booking workflow
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// Entry attempted without a session
    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),

    /// Draft failed validation
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// Capture form incomplete or of the wrong shape
    #[error("payment details incomplete: {0}")]
    Capture(String),

    /// Gateway reported a failure
    #[error(transparent)]
    Settlement(#[from] SettlementError),

    /// External provider never reported back
    #[error("external payment was not confirmed in time")]
    HandoffTimedOut,

    /// Command not accepted in the current phase; nothing changed
    #[error("cannot {action} while {phase}")]
    NotAllowed {
        /// The rejected command
        action: &'static str,
        /// Phase the workflow was in
        phase: &'static str,
    },

    /// The workflow store is not accepting actions
    #[error("booking workflow unavailable: {0}")]
    Unavailable(String),
}
