//! Application coordinator: wires authentication, the booking workflow and
//! the lifecycle manager together from a [`BookingConfig`].

use crate::auth::{
    AuthContext, DemoAuthBackend, InMemorySessionStore, JsonFileSessionStore, Redirects,
    SessionGate, SessionStore,
};
use crate::config::BookingConfig;
use crate::error::{LifecycleError, WorkflowError};
use crate::lifecycle::state::FIRST_FREE_ID;
use crate::lifecycle::{BookingLifecycleManager, LifecycleEnvironment, LifecycleState};
use crate::notifications::NotificationSequencer;
use crate::notifier::{Navigator, Notifier, TracingNavigator, TracingNotifier};
use crate::payment::{PaymentGateway, SimulatedGateway};
use crate::types::{IdGenerator, SequentialIdGenerator};
use crate::workflow::{BookingWorkflow, WorkflowEnvironment, WorkflowPorts};
use classbook_core::environment::{Clock, SystemClock};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

/// Application errors
#[derive(Error, Debug)]
pub enum AppError {
    /// The booking workflow failed to stop cleanly
    #[error("workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// The lifecycle manager failed to stop cleanly
    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),
}

/// Outside-world collaborators of the application
#[derive(Clone)]
pub struct AppPorts {
    /// Clock for timestamps
    pub clock: Arc<dyn Clock>,
    /// Toasts and confirmations
    pub notifier: Arc<dyn Notifier>,
    /// Views and external pages
    pub navigator: Arc<dyn Navigator>,
    /// Settlement for in-place methods
    pub gateway: Arc<dyn PaymentGateway>,
}

impl AppPorts {
    /// Wall clock, tracing output and the simulated gateway
    #[must_use]
    pub fn from_config(config: &BookingConfig) -> Self {
        Self {
            clock: Arc::new(SystemClock),
            notifier: TracingNotifier::shared(),
            navigator: TracingNavigator::shared(),
            gateway: SimulatedGateway::shared(config.timing.settlement_latency),
        }
    }
}

/// Main booking application
pub struct ClassbookApp {
    /// Sign-in, registration and sign-out
    pub auth: Arc<AuthContext>,
    /// Creates bookings
    pub workflow: BookingWorkflow,
    /// Maintains existing bookings
    pub lifecycle: BookingLifecycleManager,
    session_followers: [JoinHandle<()>; 2],
}

impl ClassbookApp {
    /// Build the application with tracing output and the simulated gateway
    ///
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn new(config: &BookingConfig) -> Self {
        Self::with_ports(config, AppPorts::from_config(config))
    }

    /// Build the application around the given collaborators
    ///
    /// The session store is a JSON file when `config.session.file` is set and
    /// in-memory otherwise. The lifecycle manager holds the demo history of
    /// whoever is signed in, whether the session was restored or started
    /// later, and is emptied on sign-out.
    #[must_use]
    pub fn with_ports(config: &BookingConfig, ports: AppPorts) -> Self {
        tracing::info!("Initializing Classbook application...");

        let store: Arc<dyn SessionStore> = match &config.session.file {
            Some(path) => {
                tracing::info!(path = %path.display(), "Using JSON session store");
                Arc::new(JsonFileSessionStore::new(path.clone()))
            },
            None => InMemorySessionStore::shared(),
        };

        let auth = Arc::new(
            AuthContext::init(
                DemoAuthBackend::shared(config.timing.login_latency),
                store,
                Arc::clone(&ports.notifier),
                Arc::clone(&ports.navigator),
            )
            .with_redirects(Redirects::from(&config.timing)),
        );
        tracing::info!("✓ Authentication ready");

        let initial = auth.current_session().map_or_else(LifecycleState::new, |session| {
            LifecycleState::for_session(&session, &config.venue.location)
        });

        let lifecycle = BookingLifecycleManager::new(
            initial,
            LifecycleEnvironment::new(
                Arc::clone(&ports.clock),
                Arc::clone(&ports.notifier),
                Arc::clone(&ports.navigator),
                NotificationSequencer::new(config.timing.notification_unit),
                config.timing.reschedule_redirect,
            ),
        );
        let lifecycle_follower =
            lifecycle.follow_session(auth.subscribe(), config.venue.location.clone());
        tracing::info!("✓ Lifecycle manager ready");

        let ids: Arc<dyn IdGenerator> =
            Arc::new(SequentialIdGenerator::starting_at(FIRST_FREE_ID));
        let workflow = BookingWorkflow::new(WorkflowEnvironment::new(
            WorkflowPorts {
                clock: ports.clock,
                gate: SessionGate::new(auth.clone()),
                gateway: ports.gateway,
                notifier: ports.notifier,
                navigator: ports.navigator,
                ledger: Arc::new(lifecycle.clone()),
                ids,
            },
            config,
        ));
        let workflow_follower = workflow.follow_session(auth.subscribe());
        tracing::info!("✓ Booking workflow ready");

        Self {
            auth,
            workflow,
            lifecycle,
            session_followers: [workflow_follower, lifecycle_follower],
        }
    }

    /// Wait for pending work in both stores, then stop
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] if either store still has work after `timeout`.
    pub async fn shutdown(self, timeout: Duration) -> Result<(), AppError> {
        tracing::info!("Shutting down Classbook application...");
        for follower in &self.session_followers {
            follower.abort();
        }
        self.workflow.shutdown(timeout).await?;
        self.lifecycle.shutdown(timeout).await?;
        tracing::info!("✓ Shutdown complete");
        Ok(())
    }
}

impl std::fmt::Debug for ClassbookApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassbookApp")
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}
