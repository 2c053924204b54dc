//! Staged confirmation notifications.
//!
//! A booking confirmation goes out as three events: an in-app banner
//! immediately, an email one time unit later and a text message one unit
//! after that. Cancelling a booking produces a single banner. The order and
//! the spacing are part of the contract; delivery itself is fire-and-forget.

use crate::types::{Channel, Recipient, ToastKind};
use chrono::{DateTime, Utc};
use classbook_core::effect::Effect;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What a notification sequence is about
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// A booking was created
    Creation,
    /// A booking was cancelled
    Cancellation,
}

/// A notification waiting to be fired
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Delivery channel
    pub channel: Channel,
    /// Email address, phone number or display name depending on the channel
    pub audience: String,
    /// Toast kind
    pub kind: ToastKind,
    /// Headline
    pub title: String,
    /// Body text
    pub detail: String,
}

impl Notification {
    /// Fix the firing time
    #[must_use]
    pub fn fired_at(self, fired_at: DateTime<Utc>) -> NotificationEvent {
        NotificationEvent {
            channel: self.channel,
            audience: self.audience,
            fired_at,
            kind: self.kind,
            title: self.title,
            detail: self.detail,
        }
    }
}

/// A fired notification, as handed to the [`crate::notifier::Notifier`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// Delivery channel
    pub channel: Channel,
    /// Who it went to
    pub audience: String,
    /// When it fired
    pub fired_at: DateTime<Utc>,
    /// Toast kind
    pub kind: ToastKind,
    /// Headline
    pub title: String,
    /// Body text
    pub detail: String,
}

/// A notification and its offset from the trigger
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduledNotification {
    /// Offset from the trigger
    pub delay: Duration,
    /// What to fire
    pub notification: Notification,
}

/// Smallest spacing between staged notifications
pub const MIN_UNIT: Duration = Duration::from_millis(1);

/// Plans and schedules notification sequences
#[derive(Clone, Copy, Debug)]
pub struct NotificationSequencer {
    unit: Duration,
}

impl Default for NotificationSequencer {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl NotificationSequencer {
    /// Sequencer spacing staged notifications `unit` apart
    ///
    /// A unit below [`MIN_UNIT`] is raised to it.
    #[must_use]
    pub const fn new(unit: Duration) -> Self {
        let unit = if unit.as_nanos() < MIN_UNIT.as_nanos() {
            MIN_UNIT
        } else {
            unit
        };
        Self { unit }
    }

    /// Spacing between staged notifications
    #[must_use]
    pub const fn unit(&self) -> Duration {
        self.unit
    }

    /// The notifications a trigger produces, ordered by offset
    #[must_use]
    pub fn plan(&self, trigger: Trigger, recipient: &Recipient) -> Vec<ScheduledNotification> {
        match trigger {
            Trigger::Creation => vec![
                ScheduledNotification {
                    delay: Duration::ZERO,
                    notification: Notification {
                        channel: Channel::ConfirmationBanner,
                        audience: recipient.name.clone(),
                        kind: ToastKind::Success,
                        title: "Booking confirmed!".to_string(),
                        detail: "You will receive a confirmation by email and text message."
                            .to_string(),
                    },
                },
                ScheduledNotification {
                    delay: self.unit,
                    notification: Notification {
                        channel: Channel::Email,
                        audience: recipient.email.clone(),
                        kind: ToastKind::Info,
                        title: "Confirmation email sent".to_string(),
                        detail: format!("Sent to {}", recipient.email),
                    },
                },
                ScheduledNotification {
                    delay: self.unit.saturating_mul(2),
                    notification: Notification {
                        channel: Channel::Sms,
                        audience: recipient.phone.clone(),
                        kind: ToastKind::Info,
                        title: "Text message sent".to_string(),
                        detail: format!("Sent to {}", recipient.phone),
                    },
                },
            ],
            Trigger::Cancellation => vec![ScheduledNotification {
                delay: Duration::ZERO,
                notification: Notification {
                    channel: Channel::ConfirmationBanner,
                    audience: recipient.name.clone(),
                    kind: ToastKind::Success,
                    title: "Booking cancelled".to_string(),
                    detail: "We sent you a confirmation by email and text message.".to_string(),
                },
            }],
        }
    }

    /// Schedule a trigger's notifications as delayed actions
    ///
    /// The returned effect runs the plan in order, each step waiting for the
    /// previous one, so later notifications never overtake earlier ones.
    pub fn schedule<A>(
        &self,
        trigger: Trigger,
        recipient: &Recipient,
        wrap: impl Fn(Notification) -> A,
    ) -> Effect<A> {
        let mut elapsed = Duration::ZERO;
        let steps = self
            .plan(trigger, recipient)
            .into_iter()
            .map(|step| {
                let wait = step.delay.saturating_sub(elapsed);
                elapsed = step.delay;
                Effect::Delay {
                    duration: wait,
                    action: Box::new(wrap(step.notification)),
                }
            })
            .collect();
        Effect::Sequential(steps)
    }
}
