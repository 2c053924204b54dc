//! Booking and payment orchestration.
//!
//! A booking run moves through a fixed sequence of phases:
//! 1. Gate: entry requires a signed-in session
//! 2. Collect: the booking form is filled in and validated, then priced
//! 3. Pay: the chosen method either captures credentials in place and
//!    settles through the gateway, or hands off to an external provider and
//!    waits for the user to report completion
//! 4. Success: the booking is recorded, confirmations go out in order, and
//!    the form resets after a dwell time
//!
//! Ending the session at any point returns the workflow to the gate and
//! cancels any pending reset or hand-off timer.

pub mod service;
pub mod state;

pub use service::{BookingWorkflow, WorkflowStore};
pub use state::{WorkflowPhase, WorkflowState};

use crate::auth::SessionGate;
use crate::config::{BookingConfig, VenueConfig};
use crate::draft::BookingDraftCollector;
use crate::error::{Field, SettlementError, ValidationErrors, WorkflowError};
use crate::lifecycle::BookingLedger;
use crate::notifications::{Notification, NotificationSequencer, Trigger};
use crate::notifier::{Navigator, Notifier};
use crate::payment::{
    CaptureError, CaptureFields, CaptureForm, PaymentGateway, PaymentMethodRouter, RouteDecision,
    SettlementReceipt,
};
use crate::pricing::PricingCalculator;
use crate::types::{
    AttemptId, Booking, BookingDraft, BookingStatus, IdGenerator, Money, PaymentAttempt,
    PaymentMethod, ToastKind, ValidatedDraft, View,
};
use chrono::{DateTime, Utc};
use classbook_core::{
    async_effect, cancellable, delay,
    effect::{Effect, EffectId},
    environment::Clock,
    reducer::Reducer,
    smallvec, SmallVec,
};
use std::sync::Arc;
use std::time::Duration;

/// Cancellation id of the post-success form reset
pub const RESET_TIMER: EffectId = EffectId::new("workflow.reset_after_success");

/// Cancellation id of the external hand-off timeout
pub const HANDOFF_TIMEOUT: EffectId = EffectId::new("workflow.handoff_timeout");

// ============================================================================
// Actions
// ============================================================================

/// Actions for the booking workflow
///
/// The first group are user commands; the rest are fed back by effects.
#[derive(Clone, Debug)]
pub enum WorkflowAction {
    // Commands
    /// Open the workflow
    Enter,

    /// Edit one form field
    SetField {
        /// Which field
        field: Field,
        /// New contents
        value: String,
    },

    /// Validate and price the form
    SubmitDraft,

    /// Return from method selection to the form
    Back,

    /// Choose (or change) the payment method
    SelectMethod {
        /// Chosen method
        method: PaymentMethod,
    },

    /// Type into the capture form
    EnterCaptureFields {
        /// Current form contents
        fields: CaptureFields,
    },

    /// Close the capture form without paying
    CloseCapture,

    /// Submit the entered credentials for settlement
    SubmitPayment,

    /// The user reports the external payment as done
    ConfirmHandoff,

    /// The user abandons the external payment
    CancelHandoff,

    // External events
    /// The signed-in session went away
    SessionEnded,

    // Effect feedback
    /// The gateway answered
    SettlementFinished {
        /// Attempt the answer is about
        attempt_id: AttemptId,
        /// Gateway answer
        result: Result<SettlementReceipt, SettlementError>,
    },

    /// The external provider never got reported back
    HandoffTimedOut {
        /// Attempt that timed out
        attempt_id: AttemptId,
    },

    /// A scheduled confirmation is due
    DeliverNotification {
        /// What to deliver
        notification: Notification,
    },

    /// The success screen has been shown long enough
    ResetAfterSuccess {
        /// Cycle the reset was scheduled in
        cycle: u64,
    },
}

impl WorkflowAction {
    /// Short name for logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Enter => "enter",
            Self::SetField { .. } => "set_field",
            Self::SubmitDraft => "submit_draft",
            Self::Back => "back",
            Self::SelectMethod { .. } => "select_method",
            Self::EnterCaptureFields { .. } => "enter_capture_fields",
            Self::CloseCapture => "close_capture",
            Self::SubmitPayment => "submit_payment",
            Self::ConfirmHandoff => "confirm_handoff",
            Self::CancelHandoff => "cancel_handoff",
            Self::SessionEnded => "session_ended",
            Self::SettlementFinished { .. } => "settlement_finished",
            Self::HandoffTimedOut { .. } => "handoff_timed_out",
            Self::DeliverNotification { .. } => "deliver_notification",
            Self::ResetAfterSuccess { .. } => "reset_after_success",
        }
    }

    /// True for actions issued by the user
    #[must_use]
    pub const fn is_command(&self) -> bool {
        matches!(
            self,
            Self::Enter
                | Self::SetField { .. }
                | Self::SubmitDraft
                | Self::Back
                | Self::SelectMethod { .. }
                | Self::EnterCaptureFields { .. }
                | Self::CloseCapture
                | Self::SubmitPayment
                | Self::ConfirmHandoff
                | Self::CancelHandoff
        )
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Collaborators the workflow talks to
#[derive(Clone)]
pub struct WorkflowPorts {
    /// Clock for timestamps
    pub clock: Arc<dyn Clock>,
    /// Access gate
    pub gate: SessionGate,
    /// Settlement for in-place methods
    pub gateway: Arc<dyn PaymentGateway>,
    /// Toasts and confirmations
    pub notifier: Arc<dyn Notifier>,
    /// Login redirect and external hand-off
    pub navigator: Arc<dyn Navigator>,
    /// Where created bookings go
    pub ledger: Arc<dyn BookingLedger>,
    /// Booking id source
    pub ids: Arc<dyn IdGenerator>,
}

/// Environment dependencies for the booking workflow
#[derive(Clone)]
pub struct WorkflowEnvironment {
    /// Clock for timestamps
    pub clock: Arc<dyn Clock>,
    /// Access gate
    pub gate: SessionGate,
    /// Settlement for in-place methods
    pub gateway: Arc<dyn PaymentGateway>,
    /// Toasts and confirmations
    pub notifier: Arc<dyn Notifier>,
    /// Login redirect and external hand-off
    pub navigator: Arc<dyn Navigator>,
    /// Where created bookings go
    pub ledger: Arc<dyn BookingLedger>,
    /// Booking id source
    pub ids: Arc<dyn IdGenerator>,
    /// Form validation
    pub collector: BookingDraftCollector,
    /// Price table
    pub pricing: PricingCalculator,
    /// Method dispatch
    pub router: PaymentMethodRouter,
    /// Creation confirmations
    pub sequencer: NotificationSequencer,
    /// How long the success screen stays up
    pub success_dwell: Duration,
    /// Give up on an external hand-off after this long, if set
    pub handoff_timeout: Option<Duration>,
    /// Location and instructors
    pub venue: VenueConfig,
}

impl WorkflowEnvironment {
    /// Creates a new `WorkflowEnvironment` from its collaborators and config
    #[must_use]
    pub fn new(ports: WorkflowPorts, config: &BookingConfig) -> Self {
        Self {
            clock: ports.clock,
            gate: ports.gate,
            gateway: ports.gateway,
            notifier: ports.notifier,
            navigator: ports.navigator,
            ledger: ports.ledger,
            ids: ports.ids,
            collector: BookingDraftCollector::new(),
            pricing: PricingCalculator::new(),
            router: PaymentMethodRouter::new(config.payment.external_entry_url.clone()),
            sequencer: NotificationSequencer::new(config.timing.notification_unit),
            success_dwell: config.timing.success_dwell,
            handoff_timeout: config.timing.handoff_timeout,
            venue: config.venue.clone(),
        }
    }
}

// ============================================================================
// Reducer
// ============================================================================

type Effects = SmallVec<[Effect<WorkflowAction>; 4]>;

/// Reducer for the booking workflow
#[derive(Clone, Copy, Debug, Default)]
pub struct WorkflowReducer;

impl WorkflowReducer {
    /// Creates a new `WorkflowReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn toast(
        env: &WorkflowEnvironment,
        kind: ToastKind,
        title: &'static str,
        detail: String,
    ) -> Effect<WorkflowAction> {
        let notifier = Arc::clone(&env.notifier);
        async_effect! {
            notifier.show(kind, title, &detail);
            None
        }
    }

    fn enter(state: &mut WorkflowState, env: &WorkflowEnvironment) -> Effects {
        match env.gate.require_session() {
            Ok(session) => {
                tracing::info!(user_id = %session.user_id(), "Booking workflow entered");
                state.session = Some(session);
                state.phase = WorkflowPhase::collecting();
                SmallVec::new()
            },
            Err(denied) => {
                tracing::warn!("Booking workflow entry denied: no session");
                crate::metrics::record_access_denied();
                state.last_error = Some(denied.into());
                state.phase = WorkflowPhase::Gated;

                let navigator = Arc::clone(&env.navigator);
                smallvec![
                    Self::toast(env, ToastKind::Error, "Sign in required", denied.to_string()),
                    async_effect! {
                        navigator.go_to(View::Login);
                        None
                    },
                ]
            },
        }
    }

    fn submit_draft(
        state: &mut WorkflowState,
        env: &WorkflowEnvironment,
        draft: BookingDraft,
    ) -> Effects {
        match env.collector.validate(&draft) {
            Ok(validated) => {
                let amount = env.pricing.price_for_level(validated.skill_level());
                tracing::info!(
                    skill_level = %validated.skill_level(),
                    date = %validated.date(),
                    %amount,
                    "Booking details accepted"
                );
                state.phase = WorkflowPhase::MethodSelection {
                    draft: validated,
                    amount,
                };
                SmallVec::new()
            },
            Err(errors) => {
                tracing::info!(errors = errors.len(), "Booking details rejected");
                let summary = errors.summary();
                state.last_error = Some(errors.clone().into());
                state.phase = WorkflowPhase::Collecting { draft, errors };
                smallvec![Self::toast(
                    env,
                    ToastKind::Error,
                    "Please complete the form",
                    summary
                )]
            },
        }
    }

    fn select_method(
        state: &mut WorkflowState,
        env: &WorkflowEnvironment,
        draft: ValidatedDraft,
        amount: Money,
        method: PaymentMethod,
    ) -> Effects {
        let attempt = PaymentAttempt::pending(method, amount);
        let mut effects: Effects = smallvec![Effect::Cancel {
            id: HANDOFF_TIMEOUT
        }];

        match env.router.select(method) {
            RouteDecision::Capture { form, .. } => {
                tracing::info!(%method, ?form, attempt_id = %attempt.id, "Payment method selected");
                state.phase = WorkflowPhase::Capturing {
                    draft,
                    attempt,
                    input: None,
                };
            },
            RouteDecision::Handoff { entry_url, .. } => {
                tracing::info!(%method, attempt_id = %attempt.id, %entry_url, "Handing off to external provider");

                let navigator = Arc::clone(&env.navigator);
                let url = entry_url.clone();
                effects.push(async_effect! {
                    navigator.open_external(&url);
                    None
                });
                effects.push(Self::toast(
                    env,
                    ToastKind::Info,
                    "Complete your payment",
                    format!("Finish paying with {method} in the new window, then confirm here"),
                ));
                if let Some(timeout) = env.handoff_timeout {
                    effects.push(cancellable! {
                        id: HANDOFF_TIMEOUT,
                        effect: delay! {
                            duration: timeout,
                            action: WorkflowAction::HandoffTimedOut { attempt_id: attempt.id }
                        }
                    });
                }

                state.phase = WorkflowPhase::Handoff {
                    draft,
                    attempt,
                    entry_url,
                };
            },
        }

        effects
    }

    fn submit_payment(
        state: &mut WorkflowState,
        env: &WorkflowEnvironment,
        draft: ValidatedDraft,
        attempt: PaymentAttempt,
        input: Option<CaptureFields>,
    ) -> Effects {
        let method = attempt.method;
        let checked = match &input {
            Some(fields) => fields.check(method),
            None => CaptureForm::for_method(method).map_or(
                Err(CaptureError::NotCapturable(method)),
                |form| CaptureFields::empty(form).check(method),
            ),
        };

        if let Err(error) = checked {
            tracing::info!(%method, %error, "Payment details rejected");
            let detail = error.to_string();
            state.last_error = Some(WorkflowError::Capture(detail.clone()));
            state.phase = WorkflowPhase::Capturing {
                draft,
                attempt,
                input,
            };
            return smallvec![Self::toast(
                env,
                ToastKind::Error,
                "Payment details incomplete",
                detail
            )];
        }

        tracing::info!(%method, attempt_id = %attempt.id, amount = %attempt.amount, "Payment submitted");

        let gateway = Arc::clone(&env.gateway);
        let pending = attempt.clone();
        let attempt_id = attempt.id;
        state.phase = WorkflowPhase::Settling {
            draft,
            attempt,
            submitted_at: env.clock.now(),
        };

        smallvec![async_effect! {
            let result = gateway.settle(pending).await;
            Some(WorkflowAction::SettlementFinished { attempt_id, result })
        }]
    }

    fn settlement_finished(
        state: &mut WorkflowState,
        env: &WorkflowEnvironment,
        draft: ValidatedDraft,
        mut attempt: PaymentAttempt,
        submitted_at: DateTime<Utc>,
        result: Result<SettlementReceipt, SettlementError>,
    ) -> Effects {
        let elapsed = (env.clock.now() - submitted_at).to_std().unwrap_or_default();
        crate::metrics::record_settlement_duration(elapsed.as_secs_f64());

        match result {
            Ok(receipt) => {
                tracing::info!(
                    attempt_id = %attempt.id,
                    transaction_id = %receipt.transaction_id,
                    "Payment settled"
                );
                attempt.settle();
                Self::succeed(state, env, &draft, &attempt)
            },
            Err(error) => {
                tracing::warn!(attempt_id = %attempt.id, %error, "Payment failed");
                crate::metrics::record_payment_unsettled(attempt.method, "failed");
                let detail = error.to_string();
                state.last_error = Some(error.into());
                state.phase = WorkflowPhase::MethodSelection {
                    draft,
                    amount: attempt.amount,
                };
                smallvec![Self::toast(env, ToastKind::Error, "Payment failed", detail)]
            },
        }
    }

    fn succeed(
        state: &mut WorkflowState,
        env: &WorkflowEnvironment,
        draft: &ValidatedDraft,
        attempt: &PaymentAttempt,
    ) -> Effects {
        debug_assert!(attempt.is_settled());

        let level = draft.skill_level();
        let booking = Booking {
            id: env.ids.next_booking_id(),
            date: draft.date(),
            time: draft.time(),
            skill_level: level,
            instructor: env.venue.instructor_for(level),
            status: BookingStatus::Confirmed,
            location: env.venue.location.clone(),
            payment_method: attempt.method,
            contact: draft.contact().clone(),
        };

        tracing::info!(
            booking_id = %booking.id,
            method = %attempt.method,
            amount = %attempt.amount,
            instructor = %booking.instructor,
            "Booking confirmed"
        );
        crate::metrics::record_booking_created(attempt.method, attempt.amount.cents());

        state.cycle += 1;
        let cycle = state.cycle;
        state.last_booking = Some(booking.clone());

        let confirmations = env.sequencer.schedule(
            Trigger::Creation,
            &booking.contact,
            |notification| WorkflowAction::DeliverNotification { notification },
        );
        let ledger = Arc::clone(&env.ledger);
        let recorded = booking.clone();
        state.phase = WorkflowPhase::Success { booking };

        smallvec![
            async_effect! {
                ledger.record(recorded).await;
                None
            },
            confirmations,
            cancellable! {
                id: RESET_TIMER,
                effect: delay! {
                    duration: env.success_dwell,
                    action: WorkflowAction::ResetAfterSuccess { cycle }
                }
            },
        ]
    }
}

impl Reducer for WorkflowReducer {
    type State = WorkflowState;
    type Action = WorkflowAction;
    type Environment = WorkflowEnvironment;

    #[allow(clippy::too_many_lines)]
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        if action.is_command() {
            state.last_error = None;
        }

        let phase = std::mem::take(&mut state.phase);

        match (phase, action) {
            // ========== Gate ==========
            (WorkflowPhase::Gated, WorkflowAction::Enter) => Self::enter(state, env),

            (_, WorkflowAction::SessionEnded) => {
                tracing::info!("Session ended, booking workflow closed");
                state.session = None;
                state.last_error = None;
                state.cycle += 1;
                state.phase = WorkflowPhase::Gated;
                smallvec![
                    Effect::Cancel { id: RESET_TIMER },
                    Effect::Cancel {
                        id: HANDOFF_TIMEOUT
                    },
                ]
            },

            // ========== Collecting ==========
            (
                WorkflowPhase::Collecting { mut draft, errors },
                WorkflowAction::SetField { field, value },
            ) => {
                draft.set(field, value);
                let errors = ValidationErrors(
                    errors.0.into_iter().filter(|e| e.field() != field).collect(),
                );
                state.phase = WorkflowPhase::Collecting { draft, errors };
                SmallVec::new()
            },

            (WorkflowPhase::Collecting { draft, .. }, WorkflowAction::SubmitDraft) => {
                Self::submit_draft(state, env, draft)
            },

            // ========== Method selection ==========
            (WorkflowPhase::MethodSelection { draft, .. }, WorkflowAction::Back) => {
                state.phase = WorkflowPhase::Collecting {
                    draft: draft.to_draft(),
                    errors: ValidationErrors::default(),
                };
                SmallVec::new()
            },

            (
                WorkflowPhase::MethodSelection { draft, amount },
                WorkflowAction::SelectMethod { method },
            ) => Self::select_method(state, env, draft, amount, method),

            (
                WorkflowPhase::Capturing { draft, attempt, .. }
                | WorkflowPhase::Handoff { draft, attempt, .. },
                WorkflowAction::SelectMethod { method },
            ) => Self::select_method(state, env, draft, attempt.amount, method),

            // ========== Capturing ==========
            (
                WorkflowPhase::Capturing { draft, attempt, .. },
                WorkflowAction::EnterCaptureFields { fields },
            ) => {
                state.phase = WorkflowPhase::Capturing {
                    draft,
                    attempt,
                    input: Some(fields),
                };
                SmallVec::new()
            },

            (WorkflowPhase::Capturing { draft, attempt, .. }, WorkflowAction::CloseCapture) => {
                tracing::debug!(attempt_id = %attempt.id, "Capture form closed");
                state.phase = WorkflowPhase::MethodSelection {
                    draft,
                    amount: attempt.amount,
                };
                SmallVec::new()
            },

            (
                WorkflowPhase::Capturing {
                    draft,
                    attempt,
                    input,
                },
                WorkflowAction::SubmitPayment,
            ) => Self::submit_payment(state, env, draft, attempt, input),

            // ========== Settling ==========
            (
                WorkflowPhase::Settling {
                    draft,
                    attempt,
                    submitted_at,
                },
                WorkflowAction::SettlementFinished { attempt_id, result },
            ) if attempt.id == attempt_id => {
                Self::settlement_finished(state, env, draft, attempt, submitted_at, result)
            },

            // ========== Hand-off ==========
            (
                WorkflowPhase::Handoff {
                    draft, mut attempt, ..
                },
                WorkflowAction::ConfirmHandoff,
            ) => {
                tracing::info!(attempt_id = %attempt.id, "External payment reported complete");
                attempt.settle();
                let mut effects: Effects = smallvec![Effect::Cancel {
                    id: HANDOFF_TIMEOUT
                }];
                effects.extend(Self::succeed(state, env, &draft, &attempt));
                effects
            },

            (WorkflowPhase::Handoff { draft, attempt, .. }, WorkflowAction::CancelHandoff) => {
                tracing::info!(attempt_id = %attempt.id, "External payment abandoned");
                state.phase = WorkflowPhase::MethodSelection {
                    draft,
                    amount: attempt.amount,
                };
                smallvec![Effect::Cancel {
                    id: HANDOFF_TIMEOUT
                }]
            },

            (
                WorkflowPhase::Handoff { draft, attempt, .. },
                WorkflowAction::HandoffTimedOut { attempt_id },
            ) if attempt.id == attempt_id => {
                tracing::warn!(%attempt_id, "External payment not confirmed in time");
                crate::metrics::record_payment_unsettled(attempt.method, "abandoned");
                state.last_error = Some(WorkflowError::HandoffTimedOut);
                let method = attempt.method;
                state.phase = WorkflowPhase::MethodSelection {
                    draft,
                    amount: attempt.amount,
                };
                smallvec![Self::toast(
                    env,
                    ToastKind::Error,
                    "Payment not confirmed",
                    format!("We did not hear back from {method}. Choose a payment method to try again.")
                )]
            },

            // ========== Success ==========
            (WorkflowPhase::Success { booking }, WorkflowAction::ResetAfterSuccess { cycle })
                if cycle == state.cycle =>
            {
                tracing::debug!(booking_id = %booking.id, "Booking form reset");
                state.phase = WorkflowPhase::collecting();
                SmallVec::new()
            },

            // ========== Any phase ==========
            (phase, WorkflowAction::DeliverNotification { notification }) => {
                state.phase = phase;
                let event = notification.fired_at(env.clock.now());
                let notifier = Arc::clone(&env.notifier);
                smallvec![async_effect! {
                    notifier.deliver(&event);
                    None
                }]
            },

            (
                phase,
                action @ (WorkflowAction::SettlementFinished { .. }
                | WorkflowAction::HandoffTimedOut { .. }
                | WorkflowAction::ResetAfterSuccess { .. }),
            ) => {
                tracing::debug!(action = action.name(), phase = phase.name(), "Ignored stale feedback");
                state.phase = phase;
                SmallVec::new()
            },

            (phase, action) => {
                tracing::warn!(
                    action = action.name(),
                    phase = phase.name(),
                    "Rejected action not valid in this phase"
                );
                state.last_error = Some(WorkflowError::NotAllowed {
                    action: action.name(),
                    phase: phase.name(),
                });
                state.phase = phase;
                SmallVec::new()
            },
        }
    }
}
