//! Async facade over the workflow store.
//!
//! Each command sends one action and then reports the error the reducer
//! recorded for it, so callers get a `Result` while the state machine stays
//! in the store.

use super::{WorkflowAction, WorkflowEnvironment, WorkflowPhase, WorkflowReducer, WorkflowState};
use crate::error::{Field, WorkflowError};
use crate::payment::CaptureFields;
use crate::types::{BookingDraft, PaymentMethod, Session};
use classbook_runtime::{Store, StoreError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Store type behind the workflow
pub type WorkflowStore = Store<WorkflowState, WorkflowAction, WorkflowEnvironment, WorkflowReducer>;

const FORM_FIELDS: [Field; 7] = [
    Field::Name,
    Field::Email,
    Field::Phone,
    Field::Date,
    Field::Time,
    Field::SkillLevel,
    Field::Comments,
];

fn unavailable(e: StoreError) -> WorkflowError {
    WorkflowError::Unavailable(e.to_string())
}

/// The booking workflow
#[derive(Clone)]
pub struct BookingWorkflow {
    store: WorkflowStore,
}

impl BookingWorkflow {
    /// Workflow waiting at the gate
    #[must_use]
    pub fn new(environment: WorkflowEnvironment) -> Self {
        Self {
            store: Store::new(WorkflowState::new(), WorkflowReducer::new(), environment),
        }
    }

    /// The underlying store
    #[must_use]
    pub const fn store(&self) -> &WorkflowStore {
        &self.store
    }

    /// Send an action and report the error it left behind, if any
    ///
    /// The error is read under the same lock that applied the action, so a
    /// settlement finishing concurrently cannot be reported against it.
    ///
    /// # Errors
    ///
    /// Returns the [`WorkflowError`] the reducer recorded for this action,
    /// [`WorkflowError::NotAllowed`] if the current phase does not accept it,
    /// or [`WorkflowError::Unavailable`] if the store is shutting down.
    pub async fn send(&self, action: WorkflowAction) -> Result<(), WorkflowError> {
        let (_, outcome) = self
            .store
            .send_and_inspect(action, |s| s.last_error.clone())
            .await
            .map_err(unavailable)?;
        outcome.map_or(Ok(()), Err)
    }

    /// Open the workflow with the current session
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::AccessDenied`] when nobody is signed in; the
    /// user has been sent to the login view.
    pub async fn enter(&self) -> Result<(), WorkflowError> {
        self.send(WorkflowAction::Enter).await
    }

    /// Edit one form field
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Unavailable`] if the store is shutting down.
    pub async fn set_field(
        &self,
        field: Field,
        value: impl Into<String>,
    ) -> Result<(), WorkflowError> {
        self.send(WorkflowAction::SetField {
            field,
            value: value.into(),
        })
        .await
    }

    /// Copy every field of `draft` into the form
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Unavailable`] if the store is shutting down.
    pub async fn fill(&self, draft: &BookingDraft) -> Result<(), WorkflowError> {
        for field in FORM_FIELDS {
            self.set_field(field, draft.get(field)).await?;
        }
        Ok(())
    }

    /// Validate and price the form
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Validation`] listing every problem; the form
    /// keeps its contents.
    pub async fn submit_draft(&self) -> Result<(), WorkflowError> {
        self.send(WorkflowAction::SubmitDraft).await
    }

    /// Return from method selection to the form
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Unavailable`] if the store is shutting down.
    pub async fn back(&self) -> Result<(), WorkflowError> {
        self.send(WorkflowAction::Back).await
    }

    /// Choose or change the payment method
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Unavailable`] if the store is shutting down.
    pub async fn select_method(&self, method: PaymentMethod) -> Result<(), WorkflowError> {
        self.send(WorkflowAction::SelectMethod { method }).await
    }

    /// Type into the capture form without submitting
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Unavailable`] if the store is shutting down.
    pub async fn enter_capture_fields(&self, fields: CaptureFields) -> Result<(), WorkflowError> {
        self.send(WorkflowAction::EnterCaptureFields { fields }).await
    }

    /// Close the capture form
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotAllowed`] outside the matching phase, or
    /// [`WorkflowError::Unavailable`] if the store is shutting down.
    pub async fn close_capture(&self) -> Result<(), WorkflowError> {
        self.send(WorkflowAction::CloseCapture).await
    }

    /// Enter `fields` and submit them for settlement
    ///
    /// Returns once settlement has started; the outcome arrives later as a
    /// phase change.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Capture`] if the fields are incomplete or do
    /// not fit the selected method, and [`WorkflowError::NotAllowed`] when no
    /// capture form is open.
    pub async fn submit_payment(&self, fields: CaptureFields) -> Result<(), WorkflowError> {
        self.enter_capture_fields(fields).await?;
        self.send(WorkflowAction::SubmitPayment).await
    }

    /// Report the external payment as completed
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotAllowed`] outside the matching phase, or
    /// [`WorkflowError::Unavailable`] if the store is shutting down.
    pub async fn confirm_handoff(&self) -> Result<(), WorkflowError> {
        self.send(WorkflowAction::ConfirmHandoff).await
    }

    /// Abandon the external payment
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotAllowed`] outside the matching phase, or
    /// [`WorkflowError::Unavailable`] if the store is shutting down.
    pub async fn cancel_handoff(&self) -> Result<(), WorkflowError> {
        self.send(WorkflowAction::CancelHandoff).await
    }

    /// Close the workflow because the session ended
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Unavailable`] if the store is shutting down.
    pub async fn end_session(&self) -> Result<(), WorkflowError> {
        self.send(WorkflowAction::SessionEnded).await
    }

    /// Close the workflow whenever `sessions` reports a sign-out
    ///
    /// The task ends when the sender is dropped or the store stops accepting
    /// actions.
    #[must_use]
    pub fn follow_session(&self, mut sessions: watch::Receiver<Option<Session>>) -> JoinHandle<()> {
        let workflow = self.clone();
        tokio::spawn(async move {
            while sessions.changed().await.is_ok() {
                let signed_out = sessions.borrow_and_update().is_none();
                if signed_out {
                    if let Err(e @ WorkflowError::Unavailable(_)) = workflow.end_session().await {
                        tracing::debug!(error = %e, "Stopped following session");
                        break;
                    }
                }
            }
        })
    }

    /// Current phase
    pub async fn phase(&self) -> WorkflowPhase {
        self.store.state(|s| s.phase.clone()).await
    }

    /// Copy of the whole state
    pub async fn snapshot(&self) -> WorkflowState {
        self.store.state(Clone::clone).await
    }

    /// Wait for pending settlements, notifications and timers, then stop
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Unavailable`] if work is still pending after
    /// `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), WorkflowError> {
        self.store.shutdown(timeout).await.map_err(unavailable)
    }
}

impl std::fmt::Debug for BookingWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingWorkflow").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::SessionGate;
    use crate::config::BookingConfig;
    use crate::mocks::{MockSessionProvider, RecordingLedger, RecordingNavigator, RecordingNotifier};
    use crate::payment::SimulatedGateway;
    use crate::types::{SequentialIdGenerator, SkillLevel, View};
    use crate::workflow::WorkflowPorts;
    use classbook_testing::TokioClock;
    use std::sync::Arc;

    fn workflow(provider: Arc<MockSessionProvider>) -> (BookingWorkflow, Arc<RecordingNavigator>) {
        let navigator = Arc::new(RecordingNavigator::new());
        let env = WorkflowEnvironment::new(
            WorkflowPorts {
                clock: Arc::new(TokioClock::starting_at(chrono::Utc::now())),
                gate: SessionGate::new(provider),
                gateway: SimulatedGateway::shared(Duration::from_secs(2)),
                notifier: Arc::new(RecordingNotifier::new()),
                navigator: navigator.clone(),
                ledger: Arc::new(RecordingLedger::new()),
                ids: Arc::new(SequentialIdGenerator::default()),
            },
            &BookingConfig::default(),
        );
        (BookingWorkflow::new(env), navigator)
    }

    fn session() -> Session {
        Session::new("Ana", "ana@x.com", "999", SkillLevel::Beginner).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn enter_reports_access_denied() {
        let (workflow, navigator) = workflow(Arc::new(MockSessionProvider::signed_out()));

        let err = workflow.enter().await.unwrap_err();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(matches!(err, WorkflowError::AccessDenied(_)));
        assert_eq!(workflow.phase().await, WorkflowPhase::Gated);
        assert_eq!(navigator.views(), vec![View::Login]);
    }

    #[tokio::test(start_paused = true)]
    async fn next_command_clears_last_error() {
        let (workflow, _) = workflow(Arc::new(MockSessionProvider::signed_in(session())));

        workflow.enter().await.unwrap();
        assert!(workflow.submit_draft().await.is_err());
        workflow.set_field(Field::Name, "Ana").await.unwrap();

        assert!(workflow.snapshot().await.last_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn commands_outside_their_phase_are_rejected() {
        let (workflow, _) = workflow(Arc::new(MockSessionProvider::signed_in(session())));
        workflow.enter().await.unwrap();

        assert_eq!(
            workflow.confirm_handoff().await,
            Err(WorkflowError::NotAllowed {
                action: "confirm_handoff",
                phase: "collecting",
            })
        );
        let err = workflow
            .submit_payment(CaptureFields::Card {
                number: "4242".to_string(),
                expiry: "12/27".to_string(),
                cvv: "123".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotAllowed { .. }));
        assert!(matches!(
            workflow.enter().await,
            Err(WorkflowError::NotAllowed { action: "enter", .. })
        ));

        assert_eq!(workflow.phase().await, WorkflowPhase::collecting());
    }

    #[tokio::test(start_paused = true)]
    async fn session_end_clears_error_left_by_last_command() {
        let provider = Arc::new(MockSessionProvider::signed_in(session()));
        let (workflow, _) = workflow(provider.clone());
        workflow.enter().await.unwrap();
        assert!(workflow.submit_draft().await.is_err());

        provider.set(None);
        workflow.end_session().await.unwrap();

        let state = workflow.snapshot().await;
        assert_eq!(state.phase, WorkflowPhase::Gated);
        assert!(state.last_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn follow_session_gates_on_sign_out() {
        let provider = Arc::new(MockSessionProvider::signed_in(session()));
        let (workflow, _) = workflow(provider);
        let (tx, rx) = watch::channel(Some(session()));
        let follower = workflow.follow_session(rx);

        workflow.enter().await.unwrap();
        assert_eq!(workflow.phase().await, WorkflowPhase::collecting());

        tx.send_replace(None);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(workflow.phase().await, WorkflowPhase::Gated);

        drop(tx);
        follower.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn commands_fail_after_shutdown() {
        let (workflow, _) = workflow(Arc::new(MockSessionProvider::signed_in(session())));

        workflow.shutdown(Duration::from_secs(1)).await.unwrap();

        assert!(matches!(
            workflow.enter().await,
            Err(WorkflowError::Unavailable(_))
        ));
    }
}
