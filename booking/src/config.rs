//! Configuration management for the booking application.
//!
//! Loads configuration from `CLASSBOOK_*` environment variables with sensible
//! defaults. `BookingConfig::default()` is the documented default set.

use crate::notifications::MIN_UNIT;
use crate::types::SkillLevel;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Simulated latencies, dwell times and timeouts
    pub timing: TimingConfig,
    /// Payment routing configuration
    pub payment: PaymentConfig,
    /// Where classes take place and who teaches them
    pub venue: VenueConfig,
    /// Session persistence
    pub session: SessionConfig,
    /// Default `tracing` filter directive (overridden by `RUST_LOG`)
    pub log_level: String,
}

/// Timing configuration. All values are in milliseconds in the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Spacing between staged confirmation notifications (default 1000)
    pub notification_unit: Duration,
    /// Simulated settlement latency (default 2000)
    pub settlement_latency: Duration,
    /// How long the success screen stays before the form resets (default 5000)
    pub success_dwell: Duration,
    /// Delay between the reschedule toast and the redirect (default 1500)
    pub reschedule_redirect: Duration,
    /// Simulated login/registration latency (default 1500)
    pub login_latency: Duration,
    /// Delay before the profile view opens after a sign-in (default 1000)
    pub login_redirect: Duration,
    /// Delay before the profile view opens after a registration (default 2000)
    pub registration_redirect: Duration,
    /// Delay before the welcome email toast after a registration (default 1000)
    pub welcome_email_delay: Duration,
    /// Give up on an external handoff after this long (default: wait forever)
    pub handoff_timeout: Option<Duration>,
}

/// Payment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// Entry URL of the external redirect provider
    pub external_entry_url: String,
}

/// Venue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueConfig {
    /// Location printed on every booking
    pub location: String,
    /// Instructor roster, assigned by skill level
    pub instructors: Vec<String>,
}

/// Session persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// JSON file holding the signed-in session; in-memory only when unset
    pub file: Option<PathBuf>,
}

fn parse_millis(raw: Option<&str>, default_ms: u64) -> Duration {
    Duration::from_millis(raw.and_then(|s| s.parse().ok()).unwrap_or(default_ms))
}

fn env_millis(key: &str, default_ms: u64) -> Duration {
    parse_millis(env::var(key).ok().as_deref(), default_ms)
}

/// Staged notifications stay ordered only with a non-zero spacing
fn notification_unit(raw: Option<&str>) -> Duration {
    let unit = parse_millis(raw, 1000);
    if unit < MIN_UNIT {
        tracing::warn!(
            requested_ms = unit.as_millis(),
            "Notification unit too small, using {}ms",
            MIN_UNIT.as_millis()
        );
        return MIN_UNIT;
    }
    unit
}

impl BookingConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            timing: TimingConfig {
                notification_unit: notification_unit(
                    env::var("CLASSBOOK_NOTIFICATION_UNIT_MS").ok().as_deref(),
                ),
                settlement_latency: env_millis("CLASSBOOK_SETTLEMENT_LATENCY_MS", 2000),
                success_dwell: env_millis("CLASSBOOK_SUCCESS_DWELL_MS", 5000),
                reschedule_redirect: env_millis("CLASSBOOK_RESCHEDULE_REDIRECT_MS", 1500),
                login_latency: env_millis("CLASSBOOK_LOGIN_LATENCY_MS", 1500),
                login_redirect: env_millis("CLASSBOOK_LOGIN_REDIRECT_MS", 1000),
                registration_redirect: env_millis("CLASSBOOK_REGISTRATION_REDIRECT_MS", 2000),
                welcome_email_delay: env_millis("CLASSBOOK_WELCOME_EMAIL_MS", 1000),
                handoff_timeout: env::var("CLASSBOOK_HANDOFF_TIMEOUT_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .map(Duration::from_millis),
            },
            payment: PaymentConfig {
                external_entry_url: env::var("CLASSBOOK_EXTERNAL_PAYMENT_URL")
                    .unwrap_or(defaults.payment.external_entry_url),
            },
            venue: VenueConfig {
                location: env::var("CLASSBOOK_LOCATION").unwrap_or(defaults.venue.location),
                instructors: env::var("CLASSBOOK_INSTRUCTORS")
                    .ok()
                    .map(|s| {
                        s.split(',')
                            .map(str::trim)
                            .filter(|name| !name.is_empty())
                            .map(String::from)
                            .collect::<Vec<_>>()
                    })
                    .filter(|roster| !roster.is_empty())
                    .unwrap_or(defaults.venue.instructors),
            },
            session: SessionConfig {
                file: env::var("CLASSBOOK_SESSION_FILE").ok().map(PathBuf::from),
            },
            log_level: env::var("CLASSBOOK_LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            timing: TimingConfig::default(),
            payment: PaymentConfig {
                external_entry_url: "https://www.paypal.com/checkoutnow".to_string(),
            },
            venue: VenueConfig::default(),
            session: SessionConfig { file: None },
            log_level: "classbook=info,classbook_runtime=info".to_string(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            notification_unit: Duration::from_millis(1000),
            settlement_latency: Duration::from_millis(2000),
            success_dwell: Duration::from_millis(5000),
            reschedule_redirect: Duration::from_millis(1500),
            login_latency: Duration::from_millis(1500),
            login_redirect: Duration::from_millis(1000),
            registration_redirect: Duration::from_millis(2000),
            welcome_email_delay: Duration::from_millis(1000),
            handoff_timeout: None,
        }
    }
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            location: "Playa Máncora".to_string(),
            instructors: vec![
                "María López".to_string(),
                "Ana Torres".to_string(),
                "Diego Vargas".to_string(),
                "Carlos Mendoza".to_string(),
            ],
        }
    }
}

impl VenueConfig {
    /// Instructor who teaches a skill level
    ///
    /// Levels map onto the roster in order, wrapping if the roster is short.
    #[must_use]
    pub fn instructor_for(&self, level: SkillLevel) -> String {
        let index = match level {
            SkillLevel::Beginner => 0,
            SkillLevel::Intermediate => 1,
            SkillLevel::Advanced => 2,
        };
        if self.instructors.is_empty() {
            return "Staff".to_string();
        }
        self.instructors[index % self.instructors.len()].clone()
    }
}
