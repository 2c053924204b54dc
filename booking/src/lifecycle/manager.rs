//! Async facade over the lifecycle store.

use super::{BookingFilter, LifecycleAction, LifecycleEnvironment, LifecycleReducer, LifecycleState};
use crate::error::LifecycleError;
use crate::types::{Booking, BookingId, Session};
use classbook_runtime::{Store, StoreError};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Store type behind the manager
pub type LifecycleStore = Store<LifecycleState, LifecycleAction, LifecycleEnvironment, LifecycleReducer>;

/// Somewhere to put bookings the workflow creates
pub trait BookingLedger: Send + Sync {
    /// Store a newly created booking
    ///
    /// Failures are logged, never surfaced to the workflow.
    fn record(&self, booking: Booking) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

/// Maintains existing bookings
#[derive(Clone)]
pub struct BookingLifecycleManager {
    store: LifecycleStore,
}

fn unavailable(e: StoreError) -> LifecycleError {
    LifecycleError::Unavailable(e.to_string())
}

impl BookingLifecycleManager {
    /// Manager starting from `initial` bookings
    #[must_use]
    pub fn new(initial: LifecycleState, environment: LifecycleEnvironment) -> Self {
        Self {
            store: Store::new(initial, LifecycleReducer::new(), environment),
        }
    }

    /// The underlying store
    #[must_use]
    pub const fn store(&self) -> &LifecycleStore {
        &self.store
    }

    /// Bookings matching `filter`, in insertion order
    pub async fn list(&self, filter: BookingFilter) -> Vec<Booking> {
        self.store.state(|s| s.list(filter)).await
    }

    /// Cancel an upcoming booking and send one confirmation
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] if `id` is unknown or not
    /// upcoming; nothing changes and nothing is sent.
    pub async fn cancel(&self, id: BookingId) -> Result<(), LifecycleError> {
        self.request(LifecycleAction::Cancel { id }).await
    }

    /// Show the reschedule toast and redirect to the booking form shortly after
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] if `id` is unknown or not upcoming.
    pub async fn initiate_reschedule(&self, id: BookingId) -> Result<(), LifecycleError> {
        self.request(LifecycleAction::InitiateReschedule { id }).await
    }

    /// Store a booking; a booking whose id is already known is ignored
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Unavailable`] if the store is shutting down.
    pub async fn record(&self, booking: Booking) -> Result<(), LifecycleError> {
        self.store
            .send(LifecycleAction::Record { booking })
            .await
            .map(|_| ())
            .map_err(unavailable)
    }

    /// Load the signed-in user's bookings on every sign-in and drop them on
    /// sign-out
    ///
    /// A sign-in loads the demo history at `location` for that user. The task
    /// ends when the sender is dropped or the store stops accepting actions.
    #[must_use]
    pub fn follow_session(
        &self,
        mut sessions: watch::Receiver<Option<Session>>,
        location: String,
    ) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            while sessions.changed().await.is_ok() {
                let action = match sessions.borrow_and_update().as_ref() {
                    Some(session) => LifecycleAction::SessionStarted {
                        owner: session.user_id(),
                        bookings: LifecycleState::for_session(session, &location).bookings,
                    },
                    None => LifecycleAction::SessionEnded,
                };
                if let Err(e) = manager.store.send(action).await {
                    tracing::debug!(error = %e, "Stopped following session");
                    break;
                }
            }
        })
    }

    /// Wait for pending notifications and redirects, then stop
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Unavailable`] if work is still pending after
    /// `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), LifecycleError> {
        self.store.shutdown(timeout).await.map_err(unavailable)
    }

    async fn request(&self, action: LifecycleAction) -> Result<(), LifecycleError> {
        let (_, outcome) = self
            .store
            .send_and_inspect(action, |s| s.last_error.clone())
            .await
            .map_err(unavailable)?;
        outcome.map_or(Ok(()), Err)
    }
}

impl BookingLedger for BookingLifecycleManager {
    fn record(&self, booking: Booking) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        let manager = self.clone();
        Box::pin(async move {
            let id = booking.id;
            if let Err(e) = Self::record(&manager, booking).await {
                tracing::warn!(booking_id = %id, error = %e, "Could not record booking");
            }
        })
    }
}

impl std::fmt::Debug for BookingLifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingLifecycleManager").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::{RecordingNavigator, RecordingNotifier};
    use crate::notifications::NotificationSequencer;
    use crate::types::{Channel, Recipient, SkillLevel, ToastKind, View};
    use classbook_testing::TokioClock;
    use std::sync::Arc;

    struct Harness {
        manager: BookingLifecycleManager,
        notifier: Arc<RecordingNotifier>,
        navigator: Arc<RecordingNavigator>,
    }

    fn harness() -> Harness {
        let notifier = Arc::new(RecordingNotifier::new());
        let navigator = Arc::new(RecordingNavigator::new());
        let contact = Recipient {
            name: "Juan Pérez".to_string(),
            email: "juan@x.com".to_string(),
            phone: "+51 999 123 456".to_string(),
        };
        let env = LifecycleEnvironment::new(
            Arc::new(TokioClock::starting_at(chrono::Utc::now())),
            notifier.clone(),
            navigator.clone(),
            NotificationSequencer::default(),
            Duration::from_millis(1500),
        );
        Harness {
            manager: BookingLifecycleManager::new(
                LifecycleState::seeded(&contact, "Playa Máncora"),
                env,
            ),
            notifier,
            navigator,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_sends_exactly_one_banner() {
        let h = harness();

        h.manager.cancel(BookingId::new(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let events = h.notifier.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].channel, Channel::ConfirmationBanner);

        let history = h.manager.list(BookingFilter::History).await;
        assert!(history.iter().any(|b| b.id == BookingId::new(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn second_cancel_is_not_found_and_silent() {
        let h = harness();

        h.manager.cancel(BookingId::new(1)).await.unwrap();
        let err = h.manager.cancel(BookingId::new(1)).await.unwrap_err();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(err, LifecycleError::NotFound(BookingId::new(1)));
        assert_eq!(h.notifier.events().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reschedule_redirects_after_delay() {
        let h = harness();

        h.manager.initiate_reschedule(BookingId::new(3)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(h.notifier.toasts()[0].kind, ToastKind::Info);
        assert!(h.navigator.views().is_empty());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(h.navigator.views(), vec![View::Booking]);
        assert_eq!(h.manager.list(BookingFilter::All).await.len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn ledger_records_new_bookings() {
        let h = harness();
        let mut booking = h.manager.list(BookingFilter::All).await[0].clone();
        booking.id = BookingId::new(1000);

        BookingLedger::record(&h.manager, booking).await;

        assert_eq!(h.manager.list(BookingFilter::Upcoming).await.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn follows_sign_in_and_sign_out() {
        let h = harness();
        let (tx, rx) = watch::channel(None);
        let follower = h.manager.follow_session(rx, "Beach".to_string());

        tx.send_replace(None);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(h.manager.list(BookingFilter::All).await.is_empty());

        let luis = Session::new("Luis", "luis@x.com", "998", SkillLevel::Advanced).unwrap();
        tx.send_replace(Some(luis));
        tokio::time::sleep(Duration::from_millis(10)).await;

        let upcoming = h.manager.list(BookingFilter::Upcoming).await;
        assert_eq!(upcoming.len(), 3);
        assert!(upcoming.iter().all(|b| b.contact.email == "luis@x.com"));
        assert!(upcoming.iter().all(|b| b.location == "Beach"));

        drop(tx);
        follower.await.unwrap();
    }
}
