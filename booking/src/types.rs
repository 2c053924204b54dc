//! Domain types for the class booking system.
//!
//! Value objects, records and identifiers shared by the workflow and the
//! lifecycle manager.

use crate::error::{AuthError, Field, UnknownSkillLevel};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a signed-in user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a booking, as shown to the user
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BookingId(u64);

impl BookingId {
    /// Wrap a raw booking number
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw booking number
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a payment attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttemptId(Uuid);

impl AttemptId {
    /// Creates a new random `AttemptId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source of booking ids for newly created bookings
pub trait IdGenerator: Send + Sync {
    /// Next unused booking id
    fn next_booking_id(&self) -> BookingId;
}

/// Hands out increasing booking ids from a starting number
#[derive(Debug)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    /// Start handing out ids at `first`
    #[must_use]
    pub const fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::starting_at(1000)
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_booking_id(&self) -> BookingId {
        BookingId(self.next.fetch_add(1, Ordering::SeqCst))
    }
}

// ============================================================================
// Value Objects
// ============================================================================

/// Experience level of an attendee
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    /// First time on a board
    Beginner,
    /// Can catch waves unassisted
    Intermediate,
    /// Comfortable in bigger surf
    Advanced,
}

impl SkillLevel {
    /// Every level, in presentation order
    pub const ALL: [Self; 3] = [Self::Beginner, Self::Intermediate, Self::Advanced];

    /// Form value for this level
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

impl FromStr for SkillLevel {
    type Err = UnknownSkillLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            _ => Err(UnknownSkillLevel(s.to_string())),
        }
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Amount of money in cents
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Money(u64);

impl Money {
    /// Zero
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from whole currency units (saturating)
    #[must_use]
    pub const fn from_units(units: u64) -> Self {
        Self(units.saturating_mul(100))
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Returns the whole units (rounded down)
    #[must_use]
    pub const fn units(&self) -> u64 {
        self.0 / 100
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Who receives confirmations for a booking
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
    /// Phone number (used for sms/WhatsApp)
    pub phone: String,
}

// ============================================================================
// Session
// ============================================================================

/// An authenticated user
///
/// Only constructible through [`Session::new`] (or deserialisation, which
/// applies the same checks), so a display name and email are always present.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SessionRecord")]
pub struct Session {
    user_id: UserId,
    display_name: String,
    email: String,
    phone: String,
    skill_level: SkillLevel,
    completed_class_count: u32,
}

#[derive(Deserialize)]
struct SessionRecord {
    user_id: UserId,
    display_name: String,
    email: String,
    phone: String,
    skill_level: SkillLevel,
    completed_class_count: u32,
}

impl TryFrom<SessionRecord> for Session {
    type Error = AuthError;

    fn try_from(record: SessionRecord) -> Result<Self, Self::Error> {
        Self::new(
            record.display_name,
            record.email,
            record.phone,
            record.skill_level,
        )
        .map(|session| Self {
            user_id: record.user_id,
            completed_class_count: record.completed_class_count,
            ..session
        })
    }
}

impl Session {
    /// Create a session for a freshly authenticated user
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingField`] if the display name or email is blank.
    pub fn new(
        display_name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
        skill_level: SkillLevel,
    ) -> Result<Self, AuthError> {
        let display_name = display_name.into().trim().to_string();
        let email = email.into().trim().to_string();
        if display_name.is_empty() {
            return Err(AuthError::MissingField("name"));
        }
        if email.is_empty() {
            return Err(AuthError::MissingField("email"));
        }
        Ok(Self {
            user_id: UserId::new(),
            display_name,
            email,
            phone: phone.into().trim().to_string(),
            skill_level,
            completed_class_count: 0,
        })
    }

    /// Set the number of classes already completed
    #[must_use]
    pub fn with_completed_classes(mut self, count: u32) -> Self {
        self.completed_class_count = count;
        self
    }

    /// User id
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Name shown in the UI
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Email address
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Phone number, possibly empty
    #[must_use]
    pub fn phone(&self) -> &str {
        &self.phone
    }

    /// Declared skill level
    #[must_use]
    pub const fn skill_level(&self) -> SkillLevel {
        self.skill_level
    }

    /// Classes completed so far
    #[must_use]
    pub const fn completed_class_count(&self) -> u32 {
        self.completed_class_count
    }

    /// The session's user as a notification recipient
    #[must_use]
    pub fn recipient(&self) -> Recipient {
        Recipient {
            name: self.display_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
        }
    }
}

// ============================================================================
// Drafts
// ============================================================================

/// Booking form contents, exactly as entered
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDraft {
    /// Attendee name
    pub name: String,
    /// Contact email
    pub email: String,
    /// Contact phone
    pub phone: String,
    /// Class date, `YYYY-MM-DD`
    pub date: String,
    /// Class start time, `HH:MM`
    pub time: String,
    /// Skill level form value
    pub skill_level: String,
    /// Optional comments
    pub comments: String,
}

impl BookingDraft {
    /// Overwrite one field
    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::Name => self.name = value,
            Field::Email => self.email = value,
            Field::Phone => self.phone = value,
            Field::Date => self.date = value,
            Field::Time => self.time = value,
            Field::SkillLevel => self.skill_level = value,
            Field::Comments => self.comments = value,
        }
    }

    /// Read one field
    #[must_use]
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Email => &self.email,
            Field::Phone => &self.phone,
            Field::Date => &self.date,
            Field::Time => &self.time,
            Field::SkillLevel => &self.skill_level,
            Field::Comments => &self.comments,
        }
    }
}

/// A draft that passed validation
///
/// Obtainable only from [`crate::draft::BookingDraftCollector::validate`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedDraft {
    pub(crate) contact: Recipient,
    pub(crate) date: NaiveDate,
    pub(crate) time: NaiveTime,
    pub(crate) skill_level: SkillLevel,
    pub(crate) comments: Option<String>,
}

impl ValidatedDraft {
    /// Attendee contact details
    #[must_use]
    pub const fn contact(&self) -> &Recipient {
        &self.contact
    }

    /// Class date
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// Class start time
    #[must_use]
    pub const fn time(&self) -> NaiveTime {
        self.time
    }

    /// Skill level
    #[must_use]
    pub const fn skill_level(&self) -> SkillLevel {
        self.skill_level
    }

    /// Comments, if any were given
    #[must_use]
    pub fn comments(&self) -> Option<&str> {
        self.comments.as_deref()
    }

    /// Back to an editable draft (used by "back")
    #[must_use]
    pub fn to_draft(&self) -> BookingDraft {
        BookingDraft {
            name: self.contact.name.clone(),
            email: self.contact.email.clone(),
            phone: self.contact.phone.clone(),
            date: self.date.format("%Y-%m-%d").to_string(),
            time: self.time.format("%H:%M").to_string(),
            skill_level: self.skill_level.as_str().to_string(),
            comments: self.comments.clone().unwrap_or_default(),
        }
    }
}

// ============================================================================
// Payments
// ============================================================================

/// How the attendee pays
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Card details captured in place
    Card,
    /// Push-app A (Yape), phone + approval code
    Yape,
    /// Push-app B (Plin), phone + approval code
    Plin,
    /// External redirect provider
    PayPal,
}

impl PaymentMethod {
    /// Every method, in presentation order
    pub const ALL: [Self; 4] = [Self::Card, Self::Yape, Self::Plin, Self::PayPal];

    /// Label shown to the user
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Card => "Card",
            Self::Yape => "Yape",
            Self::Plin => "Plin",
            Self::PayPal => "PayPal",
        }
    }

    /// True if settlement happens outside this process
    #[must_use]
    pub const fn is_external(self) -> bool {
        matches!(self, Self::PayPal)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Payment attempt status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Awaiting settlement
    Pending,
    /// Paid
    Settled,
}

/// One attempt to pay for a validated draft
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAttempt {
    /// Attempt id
    pub id: AttemptId,
    /// Chosen method
    pub method: PaymentMethod,
    /// Amount due
    pub amount: Money,
    status: PaymentStatus,
}

impl PaymentAttempt {
    /// New pending attempt
    #[must_use]
    pub fn pending(method: PaymentMethod, amount: Money) -> Self {
        Self {
            id: AttemptId::new(),
            method,
            amount,
            status: PaymentStatus::Pending,
        }
    }

    /// Current status
    #[must_use]
    pub const fn status(&self) -> PaymentStatus {
        self.status
    }

    /// True once settled
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self.status, PaymentStatus::Settled)
    }

    /// Mark the attempt paid. There is no way back to pending.
    pub fn settle(&mut self) {
        self.status = PaymentStatus::Settled;
    }
}

// ============================================================================
// Bookings
// ============================================================================

/// Booking status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Upcoming class
    Confirmed,
    /// Class took place
    Completed,
    /// Cancelled by the attendee
    Cancelled,
}

/// A paid reservation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Booking id
    pub id: BookingId,
    /// Class date
    pub date: NaiveDate,
    /// Class start time
    pub time: NaiveTime,
    /// Skill level of the class
    pub skill_level: SkillLevel,
    /// Assigned instructor
    pub instructor: String,
    /// Current status
    pub status: BookingStatus,
    /// Where the class takes place
    pub location: String,
    /// How it was paid
    pub payment_method: PaymentMethod,
    /// Who receives confirmations
    pub contact: Recipient,
}

impl Booking {
    /// True while the booking is in the upcoming set
    #[must_use]
    pub const fn is_upcoming(&self) -> bool {
        matches!(self.status, BookingStatus::Confirmed)
    }
}

// ============================================================================
// Notifications and navigation
// ============================================================================

/// Delivery channel of a confirmation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// In-app banner
    ConfirmationBanner,
    /// Email to the recipient
    Email,
    /// Text message to the recipient's phone
    Sms,
}

/// Visual kind of a toast
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToastKind {
    /// Neutral information
    Info,
    /// Something succeeded
    Success,
    /// Something went wrong
    Error,
}

/// Views the application can navigate to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum View {
    /// Landing page
    Home,
    /// Sign-in / registration
    Login,
    /// Booking workflow
    Booking,
    /// The user's profile and bookings
    Profile,
    /// Weekly schedule
    Schedule,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Home => "home",
            Self::Login => "login",
            Self::Booking => "booking",
            Self::Profile => "profile",
            Self::Schedule => "schedule",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn skill_level_parses_case_insensitively() {
        assert_eq!(" Intermediate ".parse::<SkillLevel>(), Ok(SkillLevel::Intermediate));
        assert_eq!("ADVANCED".parse::<SkillLevel>(), Ok(SkillLevel::Advanced));
        assert!("expert".parse::<SkillLevel>().is_err());
    }

    #[test]
    fn money_display() {
        assert_eq!(Money::from_units(70).to_string(), "70.00");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
    }

    #[test]
    fn session_requires_name_and_email() {
        assert_eq!(
            Session::new(" ", "a@b.c", "", SkillLevel::Beginner),
            Err(AuthError::MissingField("name"))
        );
        assert_eq!(
            Session::new("Ana", "", "", SkillLevel::Beginner),
            Err(AuthError::MissingField("email"))
        );
    }

    #[test]
    fn session_deserialisation_applies_checks() {
        let session = Session::new("Ana", "ana@x.com", "999", SkillLevel::Advanced)
            .unwrap()
            .with_completed_classes(3);
        let json = serde_json::to_string(&session).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);

        let blank = json.replace("\"Ana\"", "\"\"");
        assert!(serde_json::from_str::<Session>(&blank).is_err());
    }

    #[test]
    fn attempt_settles_once() {
        let mut attempt = PaymentAttempt::pending(PaymentMethod::Card, Money::from_units(50));
        assert_eq!(attempt.status(), PaymentStatus::Pending);
        attempt.settle();
        attempt.settle();
        assert!(attempt.is_settled());
    }

    #[test]
    fn sequential_ids_increase() {
        let ids = SequentialIdGenerator::starting_at(7);
        assert_eq!(ids.next_booking_id(), BookingId::new(7));
        assert_eq!(ids.next_booking_id(), BookingId::new(8));
    }
}
