//! Business metrics for the booking system.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `classbook_bookings_total{status}` - Bookings by status (created, cancelled)
//! - `classbook_payments_total{status, method}` - Payment attempts by outcome
//! - `classbook_payment_revenue_cents_total` - Revenue from settled payments
//! - `classbook_reschedules_total` - Reschedule hand-offs started
//! - `classbook_access_denied_total` - Workflow entries without a session
//! - `classbook_sessions_total{status}` - Sessions started and ended
//!
//! ## Histograms
//! - `classbook_payment_duration_seconds` - Time from submission to settlement

use crate::types::PaymentMethod;
use metrics::{describe_counter, describe_histogram};

/// Register descriptions for every booking metric.
///
/// Call once at startup, after the recorder is installed.
pub fn register_booking_metrics() {
    describe_counter!(
        "classbook_bookings_total",
        "Total number of bookings by status (created, cancelled)"
    );
    describe_counter!(
        "classbook_payments_total",
        "Total number of payment attempts by status (settled, failed, abandoned)"
    );
    describe_counter!(
        "classbook_payment_revenue_cents_total",
        "Total revenue from settled payments in cents"
    );
    describe_histogram!(
        "classbook_payment_duration_seconds",
        "Time from payment submission to settlement"
    );
    describe_counter!(
        "classbook_reschedules_total",
        "Total number of reschedule hand-offs started"
    );
    describe_counter!(
        "classbook_access_denied_total",
        "Attempts to enter the booking workflow without a session"
    );
    describe_counter!(
        "classbook_sessions_total",
        "Sessions by status (started, ended)"
    );

    tracing::info!("Booking metrics registered");
}

/// Record a booking created by the workflow.
pub fn record_booking_created(method: PaymentMethod, amount_cents: u64) {
    metrics::counter!("classbook_bookings_total", "status" => "created").increment(1);
    metrics::counter!("classbook_payments_total", "status" => "settled", "method" => method.label())
        .increment(1);
    metrics::counter!("classbook_payment_revenue_cents_total").increment(amount_cents);
    tracing::debug!(%method, amount_cents, "Recorded booking_created metric");
}

/// Record a booking cancelled through the lifecycle manager.
pub fn record_booking_cancelled() {
    metrics::counter!("classbook_bookings_total", "status" => "cancelled").increment(1);
    tracing::debug!("Recorded booking_cancelled metric");
}

/// Record how long a gateway took to settle.
pub fn record_settlement_duration(duration_secs: f64) {
    metrics::histogram!("classbook_payment_duration_seconds").record(duration_secs);
}

/// Record a payment that did not settle.
///
/// # Arguments
///
/// * `status` - `failed` for gateway errors, `abandoned` for timed out hand-offs
pub fn record_payment_unsettled(method: PaymentMethod, status: &'static str) {
    metrics::counter!("classbook_payments_total", "status" => status, "method" => method.label())
        .increment(1);
    tracing::debug!(%method, status, "Recorded payment_unsettled metric");
}

/// Record a reschedule hand-off.
pub fn record_reschedule_initiated() {
    metrics::counter!("classbook_reschedules_total").increment(1);
}

/// Record a denied workflow entry.
pub fn record_access_denied() {
    metrics::counter!("classbook_access_denied_total").increment(1);
}

/// Record a session starting (`started`) or ending (`ended`).
pub fn record_session(status: &'static str) {
    metrics::counter!("classbook_sessions_total", "status" => status).increment(1);
}
