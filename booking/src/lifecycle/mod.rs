//! Booking lifecycle management.
//!
//! Holds the signed-in user's bookings (their seeded history plus whatever
//! they book in this process) and handles the two operations available on an
//! upcoming booking:
//! 1. Cancel: the booking moves to history and one confirmation fires
//! 2. Reschedule: an info toast, then a redirect to the booking form after a
//!    short delay. The original booking is left untouched.
//!
//! A sign-in swaps in that user's history and a sign-out clears it, so one
//! user never sees another's bookings.

pub mod manager;
pub mod state;

pub use manager::{BookingLedger, BookingLifecycleManager, LifecycleStore};
pub use state::{BookingFilter, LifecycleState};

use crate::error::LifecycleError;
use crate::notifications::{Notification, NotificationSequencer, Trigger};
use crate::notifier::{Navigator, Notifier};
use crate::types::{Booking, BookingId, BookingStatus, ToastKind, UserId, View};
use classbook_core::{
    async_effect, effect::Effect, environment::Clock, reducer::Reducer, smallvec, SmallVec,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Actions
// ============================================================================

/// Actions for the lifecycle manager
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum LifecycleAction {
    /// Store a booking produced by the workflow
    Record {
        /// The new booking
        booking: Booking,
    },

    /// Cancel an upcoming booking
    Cancel {
        /// Booking to cancel
        id: BookingId,
    },

    /// Start moving an upcoming booking to another slot
    InitiateReschedule {
        /// Booking to reschedule
        id: BookingId,
    },

    /// Redirect delay for a reschedule has elapsed
    RescheduleRedirect {
        /// Booking being rescheduled
        id: BookingId,
    },

    /// A scheduled notification is due
    DeliverNotification {
        /// What to deliver
        notification: Notification,
    },

    /// A user signed in
    SessionStarted {
        /// The signed-in user
        owner: UserId,
        /// Their existing bookings
        bookings: Vec<Booking>,
    },

    /// The user signed out
    SessionEnded,
}

// ============================================================================
// Environment
// ============================================================================

/// Environment dependencies for the lifecycle manager
#[derive(Clone)]
pub struct LifecycleEnvironment {
    /// Clock for notification timestamps
    pub clock: Arc<dyn Clock>,
    /// Toasts and confirmations
    pub notifier: Arc<dyn Notifier>,
    /// Redirect after a reschedule
    pub navigator: Arc<dyn Navigator>,
    /// Plans cancellation confirmations
    pub sequencer: NotificationSequencer,
    /// Delay between the reschedule toast and the redirect
    pub reschedule_redirect: Duration,
}

impl LifecycleEnvironment {
    /// Creates a new `LifecycleEnvironment`
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
        sequencer: NotificationSequencer,
        reschedule_redirect: Duration,
    ) -> Self {
        Self {
            clock,
            notifier,
            navigator,
            sequencer,
            reschedule_redirect,
        }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the lifecycle manager
#[derive(Clone, Copy, Debug, Default)]
pub struct LifecycleReducer;

impl LifecycleReducer {
    /// Creates a new `LifecycleReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Reducer for LifecycleReducer {
    type State = LifecycleState;
    type Action = LifecycleAction;
    type Environment = LifecycleEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            LifecycleAction::SessionStarted { owner, bookings } => {
                if state.owner == Some(owner) {
                    tracing::debug!(user_id = %owner, "Bookings already loaded for user");
                    return SmallVec::new();
                }
                tracing::info!(user_id = %owner, count = bookings.len(), "Loaded bookings for user");
                // Bookings recorded before the sign-in was seen belong to the new user
                let unowned = if state.owner.is_none() {
                    std::mem::take(&mut state.bookings)
                } else {
                    Vec::new()
                };
                state.owner = Some(owner);
                state.bookings = bookings;
                for booking in unowned {
                    if !state.contains(booking.id) {
                        state.bookings.push(booking);
                    }
                }
                state.last_error = None;
                SmallVec::new()
            },

            LifecycleAction::SessionEnded => {
                if let Some(owner) = state.owner.take() {
                    tracing::info!(user_id = %owner, "Cleared bookings of signed-out user");
                }
                state.bookings.clear();
                state.last_error = None;
                SmallVec::new()
            },

            LifecycleAction::Record { booking } => {
                if state.contains(booking.id) {
                    tracing::debug!(booking_id = %booking.id, "Booking already recorded");
                    return SmallVec::new();
                }
                tracing::info!(
                    booking_id = %booking.id,
                    date = %booking.date,
                    instructor = %booking.instructor,
                    "Booking recorded"
                );
                state.bookings.push(booking);
                SmallVec::new()
            },

            LifecycleAction::Cancel { id } => {
                let Some(booking) = state.upcoming_mut(id) else {
                    tracing::warn!(booking_id = %id, "Cancel rejected: no upcoming booking");
                    state.last_error = Some(LifecycleError::NotFound(id));
                    return SmallVec::new();
                };

                booking.status = BookingStatus::Cancelled;
                let contact = booking.contact.clone();
                state.last_error = None;

                tracing::info!(booking_id = %id, "Booking cancelled");
                crate::metrics::record_booking_cancelled();

                smallvec![env.sequencer.schedule(
                    Trigger::Cancellation,
                    &contact,
                    |notification| LifecycleAction::DeliverNotification { notification },
                )]
            },

            LifecycleAction::InitiateReschedule { id } => {
                if state.upcoming_mut(id).is_none() {
                    tracing::warn!(booking_id = %id, "Reschedule rejected: no upcoming booking");
                    state.last_error = Some(LifecycleError::NotFound(id));
                    return SmallVec::new();
                }
                state.last_error = None;

                tracing::info!(booking_id = %id, "Reschedule initiated");
                crate::metrics::record_reschedule_initiated();

                let notifier = Arc::clone(&env.notifier);
                smallvec![
                    async_effect! {
                        notifier.show(
                            ToastKind::Info,
                            "Reschedule your class",
                            "Taking you to the booking form to pick a new date",
                        );
                        None
                    },
                    Effect::Delay {
                        duration: env.reschedule_redirect,
                        action: Box::new(LifecycleAction::RescheduleRedirect { id }),
                    }
                ]
            },

            LifecycleAction::RescheduleRedirect { id } => {
                tracing::debug!(booking_id = %id, "Reschedule redirect");
                let navigator = Arc::clone(&env.navigator);
                smallvec![async_effect! {
                    navigator.go_to(View::Booking);
                    None
                }]
            },

            LifecycleAction::DeliverNotification { notification } => {
                let event = notification.fired_at(env.clock.now());
                let notifier = Arc::clone(&env.notifier);
                smallvec![async_effect! {
                    notifier.deliver(&event);
                    None
                }]
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::{RecordingNavigator, RecordingNotifier};
    use crate::types::{Channel, Recipient, Session, SkillLevel};
    use classbook_testing::{assertions, test_clock, ReducerTest};

    fn contact() -> Recipient {
        Recipient {
            name: "Juan Pérez".to_string(),
            email: "juan@x.com".to_string(),
            phone: "+51 999 123 456".to_string(),
        }
    }

    fn create_test_env() -> LifecycleEnvironment {
        LifecycleEnvironment::new(
            Arc::new(test_clock()),
            Arc::new(RecordingNotifier::new()),
            Arc::new(RecordingNavigator::new()),
            NotificationSequencer::default(),
            Duration::from_millis(1500),
        )
    }

    fn seeded() -> LifecycleState {
        LifecycleState::seeded(&contact(), "Playa Máncora")
    }

    #[test]
    fn test_cancel_moves_booking_to_history() {
        ReducerTest::new(LifecycleReducer::new())
            .with_env(create_test_env())
            .given_state(seeded())
            .when_action(LifecycleAction::Cancel {
                id: BookingId::new(2),
            })
            .then_state(|state| {
                let upcoming: Vec<u64> = state
                    .list(BookingFilter::Upcoming)
                    .iter()
                    .map(|b| b.id.value())
                    .collect();
                assert_eq!(upcoming, vec![1, 3]);
                assert_eq!(
                    state.get(BookingId::new(2)).unwrap().status,
                    BookingStatus::Cancelled
                );
                assert!(state.last_error.is_none());
            })
            .then_effects(|effects| {
                let mut banners = 0;
                for effect in effects {
                    effect.visit(&mut |e| {
                        if let Effect::Delay { action, .. } = e {
                            if let LifecycleAction::DeliverNotification { notification } = &**action {
                                assert_eq!(notification.channel, Channel::ConfirmationBanner);
                                banners += 1;
                            }
                        }
                    });
                }
                assert_eq!(banners, 1);
            })
            .run();
    }

    #[test]
    fn test_cancel_twice_is_not_found() {
        ReducerTest::new(LifecycleReducer::new())
            .with_env(create_test_env())
            .given_state(seeded())
            .when_action(LifecycleAction::Cancel {
                id: BookingId::new(2),
            })
            .when_action(LifecycleAction::Cancel {
                id: BookingId::new(2),
            })
            .then_state(|state| {
                assert_eq!(
                    state.last_error,
                    Some(LifecycleError::NotFound(BookingId::new(2)))
                );
                assert_eq!(state.list(BookingFilter::History).len(), 4);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_cancel_unknown_id_changes_nothing() {
        ReducerTest::new(LifecycleReducer::new())
            .with_env(create_test_env())
            .given_state(seeded())
            .when_action(LifecycleAction::Cancel {
                id: BookingId::new(999),
            })
            .then_state(|state| {
                assert_eq!(state.list(BookingFilter::Upcoming).len(), 3);
                assert_eq!(
                    state.last_error,
                    Some(LifecycleError::NotFound(BookingId::new(999)))
                );
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_reschedule_toasts_then_redirects_later() {
        ReducerTest::new(LifecycleReducer::new())
            .with_env(create_test_env())
            .given_state(seeded())
            .when_action(LifecycleAction::InitiateReschedule {
                id: BookingId::new(1),
            })
            .then_state(|state| {
                assert_eq!(state.list(BookingFilter::All).len(), 6);
                assert_eq!(state.list(BookingFilter::Upcoming).len(), 3);
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 2);
                assertions::assert_has_future_effect(effects);
                assertions::assert_has_delay(effects, |duration, action| {
                    duration == Duration::from_millis(1500)
                        && matches!(action, LifecycleAction::RescheduleRedirect { id } if id.value() == 1)
                });
            })
            .run();
    }

    #[test]
    fn test_reschedule_of_history_booking_is_not_found() {
        ReducerTest::new(LifecycleReducer::new())
            .with_env(create_test_env())
            .given_state(seeded())
            .when_action(LifecycleAction::InitiateReschedule {
                id: BookingId::new(101),
            })
            .then_state(|state| {
                assert_eq!(
                    state.last_error,
                    Some(LifecycleError::NotFound(BookingId::new(101)))
                );
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_record_ignores_duplicates() {
        let booking = seeded().get(BookingId::new(1)).cloned().unwrap();

        ReducerTest::new(LifecycleReducer::new())
            .with_env(create_test_env())
            .given_state(LifecycleState::new())
            .when_action(LifecycleAction::Record {
                booking: booking.clone(),
            })
            .when_action(LifecycleAction::Record { booking })
            .then_state(|state| {
                assert_eq!(state.bookings.len(), 1);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_new_user_replaces_previous_bookings() {
        let ana = Session::new("Ana", "ana@x.com", "999", SkillLevel::Beginner).unwrap();
        let luis = Session::new("Luis", "luis@x.com", "998", SkillLevel::Advanced).unwrap();
        let luis_history = LifecycleState::for_session(&luis, "Beach").bookings;

        ReducerTest::new(LifecycleReducer::new())
            .with_env(create_test_env())
            .given_state(LifecycleState::for_session(&ana, "Beach"))
            .when_action(LifecycleAction::SessionStarted {
                owner: luis.user_id(),
                bookings: luis_history.clone(),
            })
            .then_state(move |state| {
                assert_eq!(state.owner, Some(luis.user_id()));
                assert_eq!(state.bookings, luis_history);
                assert!(state.bookings.iter().all(|b| b.contact.email == "luis@x.com"));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_booking_recorded_before_sign_in_is_kept() {
        let luis = Session::new("Luis", "luis@x.com", "998", SkillLevel::Advanced).unwrap();
        let mut early = seeded().get(BookingId::new(1)).cloned().unwrap();
        early.id = BookingId::new(104);

        ReducerTest::new(LifecycleReducer::new())
            .with_env(create_test_env())
            .given_state(LifecycleState::new())
            .when_action(LifecycleAction::Record { booking: early })
            .when_action(LifecycleAction::SessionStarted {
                owner: luis.user_id(),
                bookings: LifecycleState::for_session(&luis, "Beach").bookings,
            })
            .then_state(|state| {
                assert_eq!(state.bookings.len(), 7);
                assert!(state.contains(BookingId::new(104)));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_same_user_keeps_bookings() {
        let ana = Session::new("Ana", "ana@x.com", "999", SkillLevel::Beginner).unwrap();
        let mut state = LifecycleState::for_session(&ana, "Beach");
        state.bookings[0].status = BookingStatus::Cancelled;

        ReducerTest::new(LifecycleReducer::new())
            .with_env(create_test_env())
            .given_state(state)
            .when_action(LifecycleAction::SessionStarted {
                owner: ana.user_id(),
                bookings: Vec::new(),
            })
            .then_state(|state| {
                assert_eq!(state.bookings.len(), 6);
                assert_eq!(state.bookings[0].status, BookingStatus::Cancelled);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_sign_out_clears_bookings() {
        let ana = Session::new("Ana", "ana@x.com", "999", SkillLevel::Beginner).unwrap();

        ReducerTest::new(LifecycleReducer::new())
            .with_env(create_test_env())
            .given_state(LifecycleState::for_session(&ana, "Beach"))
            .when_action(LifecycleAction::SessionEnded)
            .when_action(LifecycleAction::Cancel {
                id: BookingId::new(1),
            })
            .then_state(|state| {
                assert!(state.owner.is_none());
                assert!(state.bookings.is_empty());
                assert_eq!(
                    state.last_error,
                    Some(LifecycleError::NotFound(BookingId::new(1)))
                );
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }
}
