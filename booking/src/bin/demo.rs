//! Classbook Demo
//!
//! Walks through one booking run end to end:
//! - Entry denied before sign-in
//! - Sign-in, form validation, pricing
//! - Card payment with simulated settlement
//! - Staged confirmations and the form reset
//! - Cancelling the new booking
//!
//! # Usage
//!
//! ```bash
//! # Faster timings, JSON session file
//! CLASSBOOK_SETTLEMENT_LATENCY_MS=500 CLASSBOOK_SESSION_FILE=/tmp/session.json \
//!     cargo run --bin classbook-demo
//! ```

use anyhow::Context;
use classbook::auth::LoginCredentials;
use classbook::payment::CaptureFields;
use classbook::{
    BookingConfig, BookingDraft, BookingFilter, ClassbookApp, PaymentMethod, WorkflowPhase,
};
use classbook_runtime::metrics::{describe_store_metrics, MetricsExporter};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = BookingConfig::from_env();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let exporter = MetricsExporter::install().context("installing metrics recorder")?;
    describe_store_metrics();
    classbook::metrics::register_booking_metrics();

    println!("\n🏄 ============================================");
    println!("   Classbook - Live Demo");
    println!("============================================\n");

    let app = ClassbookApp::new(&config);

    // ========== Demo Scenario ==========

    println!("1️⃣  Opening the booking form without signing in...");
    if let Err(e) = app.workflow.enter().await {
        println!("   ✗ {e}\n");
    }

    println!("2️⃣  Signing in...");
    let session = app
        .auth
        .login(LoginCredentials {
            email: "juan@example.com".to_string(),
            password: "secret".to_string(),
        })
        .await
        .context("signing in")?;
    println!("   ✓ Signed in as {}\n", session.display_name());

    println!("3️⃣  Filling in the booking form...");
    app.workflow.enter().await?;
    if let Err(e) = app.workflow.submit_draft().await {
        println!("   ✗ Empty form rejected: {e}");
    }

    let draft = BookingDraft {
        name: "Ana".to_string(),
        email: "ana@x.com".to_string(),
        phone: "999".to_string(),
        date: "2025-12-01".to_string(),
        time: "09:00".to_string(),
        skill_level: "intermediate".to_string(),
        comments: String::new(),
    };
    app.workflow.fill(&draft).await?;
    app.workflow.submit_draft().await?;
    if let Some(amount) = app.workflow.phase().await.amount() {
        println!("   ✓ Details accepted, price {amount}\n");
    }

    println!("4️⃣  Paying by card...");
    app.workflow.select_method(PaymentMethod::Card).await?;
    app.workflow
        .submit_payment(CaptureFields::Card {
            number: "4242 4242 4242 4242".to_string(),
            expiry: "12/27".to_string(),
            cvv: "123".to_string(),
        })
        .await?;
    println!("   ⏳ Settling...");

    tokio::time::sleep(config.timing.settlement_latency + Duration::from_millis(100)).await;
    let booking = match app.workflow.phase().await {
        WorkflowPhase::Success { booking } => booking,
        other => anyhow::bail!("expected a confirmed booking, workflow is {}", other.name()),
    };
    println!(
        "   ✓ Booking {} confirmed with {} on {} at {}\n",
        booking.id, booking.instructor, booking.date, booking.time
    );

    println!("5️⃣  Waiting for confirmations and the form reset...");
    tokio::time::sleep(config.timing.success_dwell).await;
    println!("   ✓ Workflow is back at: {}\n", app.workflow.phase().await.name());

    println!("6️⃣  Cancelling the booking...");
    app.lifecycle.cancel(booking.id).await?;
    let history = app.lifecycle.list(BookingFilter::History).await;
    println!("   ✓ {} booking(s) in history\n", history.len());

    app.auth.teardown();
    app.shutdown(Duration::from_secs(10)).await?;

    if let Some(rendered) = exporter.render() {
        println!("📈 Metrics\n");
        for line in rendered.lines().filter(|l| l.starts_with("classbook_")) {
            println!("   {line}");
        }
    }

    println!("\n✓ Demo complete");
    Ok(())
}
