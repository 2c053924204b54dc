//! Booking workflow state.

use crate::error::{ValidationErrors, WorkflowError};
use crate::payment::CaptureFields;
use crate::types::{Booking, BookingDraft, Money, PaymentAttempt, PaymentMethod, Session, ValidatedDraft};
use chrono::{DateTime, Utc};

/// Where a booking run currently is
///
/// Each phase carries exactly the data that is meaningful in it, so a
/// payment cannot exist without a validated draft and a booking cannot
/// exist without a settled payment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum WorkflowPhase {
    /// No session; the workflow cannot be entered
    #[default]
    Gated,

    /// Filling in the booking form
    Collecting {
        /// Form contents as typed
        draft: BookingDraft,
        /// Problems found by the last submission
        errors: ValidationErrors,
    },

    /// Choosing how to pay
    MethodSelection {
        /// Frozen form contents
        draft: ValidatedDraft,
        /// Price of the class
        amount: Money,
    },

    /// Entering credentials for an in-place method
    Capturing {
        /// Frozen form contents
        draft: ValidatedDraft,
        /// Pending attempt for the selected method
        attempt: PaymentAttempt,
        /// Entered but not yet submitted credentials
        input: Option<CaptureFields>,
    },

    /// Waiting for the user to report an external payment
    Handoff {
        /// Frozen form contents
        draft: ValidatedDraft,
        /// Pending attempt for the external method
        attempt: PaymentAttempt,
        /// Provider page that was opened
        entry_url: String,
    },

    /// Waiting for the gateway
    Settling {
        /// Frozen form contents
        draft: ValidatedDraft,
        /// Attempt submitted to the gateway
        attempt: PaymentAttempt,
        /// When the attempt was submitted
        submitted_at: DateTime<Utc>,
    },

    /// Booking created; the form resets after the dwell time
    Success {
        /// The created booking
        booking: Booking,
    },
}

impl WorkflowPhase {
    /// Fresh, empty booking form
    #[must_use]
    pub fn collecting() -> Self {
        Self::Collecting {
            draft: BookingDraft::default(),
            errors: ValidationErrors::default(),
        }
    }

    /// Short name for logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Gated => "gated",
            Self::Collecting { .. } => "collecting",
            Self::MethodSelection { .. } => "method_selection",
            Self::Capturing { .. } => "capturing",
            Self::Handoff { .. } => "handoff",
            Self::Settling { .. } => "settling",
            Self::Success { .. } => "success",
        }
    }

    /// Payment method of the pending attempt, if there is one
    #[must_use]
    pub const fn method(&self) -> Option<PaymentMethod> {
        match self {
            Self::Capturing { attempt, .. }
            | Self::Handoff { attempt, .. }
            | Self::Settling { attempt, .. } => Some(attempt.method),
            Self::Success { booking } => Some(booking.payment_method),
            Self::Gated | Self::Collecting { .. } | Self::MethodSelection { .. } => None,
        }
    }

    /// Price of the class once the draft is validated
    #[must_use]
    pub const fn amount(&self) -> Option<Money> {
        match self {
            Self::MethodSelection { amount, .. } => Some(*amount),
            Self::Capturing { attempt, .. }
            | Self::Handoff { attempt, .. }
            | Self::Settling { attempt, .. } => Some(attempt.amount),
            Self::Gated | Self::Collecting { .. } | Self::Success { .. } => None,
        }
    }
}

/// Booking workflow state
#[derive(Clone, Debug, Default)]
pub struct WorkflowState {
    /// Current phase
    pub phase: WorkflowPhase,
    /// Session the run was entered with
    pub session: Option<Session>,
    /// Incremented on every success and session end; stale resets carry an
    /// older value
    pub cycle: u64,
    /// Most recent recoverable error, cleared by the next command
    pub last_error: Option<WorkflowError>,
    /// Last booking this workflow created
    pub last_booking: Option<Booking>,
}

impl WorkflowState {
    /// Workflow waiting at the gate
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
