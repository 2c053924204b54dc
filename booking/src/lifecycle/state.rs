//! State held by the booking lifecycle manager.

use crate::error::LifecycleError;
use crate::types::{
    Booking, BookingId, BookingStatus, PaymentMethod, Recipient, Session, SkillLevel, UserId,
};
use chrono::{NaiveDate, NaiveTime};

/// Which bookings to list
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BookingFilter {
    /// Confirmed bookings that have not taken place
    Upcoming,
    /// Completed and cancelled bookings
    History,
    /// Everything
    All,
}

impl BookingFilter {
    /// True if `booking` belongs in this view
    #[must_use]
    pub const fn matches(self, booking: &Booking) -> bool {
        match self {
            Self::Upcoming => booking.is_upcoming(),
            Self::History => !booking.is_upcoming(),
            Self::All => true,
        }
    }
}

/// Bookings of the signed-in user, in insertion order
#[derive(Clone, Debug, Default)]
pub struct LifecycleState {
    /// Whose bookings these are; `None` while signed out
    pub owner: Option<UserId>,
    /// Bookings, oldest first
    pub bookings: Vec<Booking>,
    /// Outcome of the last cancel or reschedule request
    pub last_error: Option<LifecycleError>,
}

type SeedRow = (
    u64,
    &'static str,
    &'static str,
    SkillLevel,
    &'static str,
    PaymentMethod,
    BookingStatus,
);

#[rustfmt::skip]
const SEED: [SeedRow; 6] = [
    (1, "2025-11-05", "08:00", SkillLevel::Intermediate, "Ana Torres", PaymentMethod::Yape, BookingStatus::Confirmed),
    (2, "2025-11-12", "10:30", SkillLevel::Intermediate, "Carlos Mendoza", PaymentMethod::Card, BookingStatus::Confirmed),
    (3, "2025-11-20", "15:00", SkillLevel::Advanced, "Diego Vargas", PaymentMethod::PayPal, BookingStatus::Confirmed),
    (101, "2025-10-15", "09:00", SkillLevel::Beginner, "María López", PaymentMethod::Plin, BookingStatus::Completed),
    (102, "2025-10-22", "08:00", SkillLevel::Intermediate, "Ana Torres", PaymentMethod::Yape, BookingStatus::Completed),
    (103, "2025-10-28", "14:00", SkillLevel::Intermediate, "Carlos Mendoza", PaymentMethod::Card, BookingStatus::Cancelled),
];

/// First booking id not taken by the demo history
pub const FIRST_FREE_ID: u64 = {
    let mut max = 0;
    let mut i = 0;
    while i < SEED.len() {
        if SEED[i].0 > max {
            max = SEED[i].0;
        }
        i += 1;
    }
    max + 1
};

impl LifecycleState {
    /// Empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Demo history for a signed-in user: three upcoming classes, two
    /// completed and one cancelled
    #[must_use]
    pub fn seeded(contact: &Recipient, location: &str) -> Self {
        let bookings = SEED
            .iter()
            .filter_map(|&(id, date, time, skill_level, instructor, payment_method, status)| {
                Some(Booking {
                    id: BookingId::new(id),
                    date: NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?,
                    time: NaiveTime::parse_from_str(time, "%H:%M").ok()?,
                    skill_level,
                    instructor: instructor.to_string(),
                    status,
                    location: location.to_string(),
                    payment_method,
                    contact: contact.clone(),
                })
            })
            .collect();

        Self {
            owner: None,
            bookings,
            last_error: None,
        }
    }

    /// Demo history owned by `session`'s user
    #[must_use]
    pub fn for_session(session: &Session, location: &str) -> Self {
        Self {
            owner: Some(session.user_id()),
            ..Self::seeded(&session.recipient(), location)
        }
    }

    /// Look up a booking
    #[must_use]
    pub fn get(&self, id: BookingId) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }

    /// Look up an upcoming booking for modification
    pub fn upcoming_mut(&mut self, id: BookingId) -> Option<&mut Booking> {
        self.bookings
            .iter_mut()
            .find(|b| b.id == id && b.is_upcoming())
    }

    /// True if a booking with `id` exists in any status
    #[must_use]
    pub fn contains(&self, id: BookingId) -> bool {
        self.get(id).is_some()
    }

    /// Bookings matching `filter`, in insertion order
    #[must_use]
    pub fn list(&self, filter: BookingFilter) -> Vec<Booking> {
        self.bookings
            .iter()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn contact() -> Recipient {
        Recipient {
            name: "Juan Pérez".to_string(),
            email: "juan@x.com".to_string(),
            phone: "+51 999 123 456".to_string(),
        }
    }

    #[test]
    fn seed_splits_into_upcoming_and_history() {
        let state = LifecycleState::seeded(&contact(), "Playa Máncora");

        let upcoming: Vec<u64> = state
            .list(BookingFilter::Upcoming)
            .iter()
            .map(|b| b.id.value())
            .collect();
        let history: Vec<u64> = state
            .list(BookingFilter::History)
            .iter()
            .map(|b| b.id.value())
            .collect();

        assert_eq!(upcoming, vec![1, 2, 3]);
        assert_eq!(history, vec![101, 102, 103]);
        assert_eq!(state.list(BookingFilter::All).len(), 6);
        assert!(state
            .bookings
            .iter()
            .all(|b| b.location == "Playa Máncora"));
    }

    #[test]
    fn session_history_is_owned_and_leaves_room_for_new_ids() {
        let session = Session::new("Luis", "luis@x.com", "998", SkillLevel::Advanced).unwrap();
        let state = LifecycleState::for_session(&session, "Beach");

        assert_eq!(state.owner, Some(session.user_id()));
        assert!(state.bookings.iter().all(|b| b.contact.email == "luis@x.com"));
        assert!(state.bookings.iter().all(|b| b.id.value() < FIRST_FREE_ID));
        assert_eq!(FIRST_FREE_ID, 104);
    }

    #[test]
    fn only_upcoming_bookings_are_mutable() {
        let mut state = LifecycleState::seeded(&contact(), "Beach");
        assert!(state.upcoming_mut(BookingId::new(2)).is_some());
        assert!(state.upcoming_mut(BookingId::new(103)).is_none());
        assert!(state.upcoming_mut(BookingId::new(999)).is_none());
        assert!(state.contains(BookingId::new(103)));
    }
}
