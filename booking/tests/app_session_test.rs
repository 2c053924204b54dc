//! Application Session Tests
//!
//! Wires the whole application from config and checks what depends on the
//! session: persistence across restarts, seeding the lifecycle manager, and
//! the workflow closing when the user signs out.

#![allow(clippy::unwrap_used)] // Test code

use classbook::auth::{LoginCredentials, RegistrationForm};
use classbook::mocks::{RecordingNavigator, RecordingNotifier};
use classbook::payment::SimulatedGateway;
use classbook::{
    AppPorts, BookingConfig, BookingDraft, BookingFilter, BookingId, ClassbookApp, LifecycleError,
    PaymentMethod, SkillLevel, ToastKind, View, WorkflowPhase,
};
use classbook_testing::TokioClock;
use std::sync::Arc;
use std::time::Duration;

struct Fakes {
    notifier: Arc<RecordingNotifier>,
    navigator: Arc<RecordingNavigator>,
}

fn app(config: &BookingConfig) -> (ClassbookApp, Fakes) {
    let notifier = Arc::new(RecordingNotifier::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let ports = AppPorts {
        clock: Arc::new(TokioClock::starting_at(chrono::Utc::now())),
        notifier: notifier.clone(),
        navigator: navigator.clone(),
        gateway: SimulatedGateway::shared(config.timing.settlement_latency),
    };
    (
        ClassbookApp::with_ports(config, ports),
        Fakes {
            notifier,
            navigator,
        },
    )
}

fn credentials() -> LoginCredentials {
    LoginCredentials {
        email: "juan@example.com".to_string(),
        password: "secret".to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_session_survives_restart_with_json_store() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = BookingConfig::default();
    config.session.file = Some(dir.path().join("session.json"));

    let (first, _) = app(&config);
    assert!(first.auth.current_session().is_none());
    assert!(first.lifecycle.list(BookingFilter::All).await.is_empty());
    let session = first.auth.login(credentials()).await.unwrap();
    first.shutdown(Duration::from_secs(1)).await.unwrap();

    let (second, _) = app(&config);
    let restored = second.auth.current_session().unwrap();
    assert_eq!(restored, session);
    assert_eq!(restored.completed_class_count(), 12);

    // A restored user sees their demo history and can enter straight away
    assert_eq!(second.lifecycle.list(BookingFilter::Upcoming).await.len(), 3);
    assert_eq!(second.lifecycle.list(BookingFilter::History).await.len(), 3);
    second.workflow.enter().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_sign_out_closes_workflow_and_clears_store() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = BookingConfig::default();
    config.session.file = Some(dir.path().join("session.json"));
    let (app, fakes) = app(&config);

    app.auth.login(credentials()).await.unwrap();
    app.workflow.enter().await.unwrap();
    assert_eq!(app.workflow.phase().await, WorkflowPhase::collecting());
    tokio::time::sleep(Duration::from_millis(1100)).await;

    app.auth.teardown();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(app.workflow.phase().await, WorkflowPhase::Gated);
    assert!(app.lifecycle.list(BookingFilter::All).await.is_empty());
    assert!(!dir.path().join("session.json").exists());
    assert_eq!(fakes.navigator.views(), vec![View::Profile, View::Home]);
    assert_eq!(fakes.notifier.toasts().last().unwrap().title, "Session closed");
}

#[tokio::test(start_paused = true)]
async fn test_fresh_login_sees_same_history_as_restart() {
    let (app, _) = app(&BookingConfig::default());

    app.auth.login(credentials()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let upcoming = app.lifecycle.list(BookingFilter::Upcoming).await;
    assert_eq!(upcoming.len(), 3);
    assert!(upcoming.iter().all(|b| b.contact.email == "juan@example.com"));
    assert_eq!(app.lifecycle.list(BookingFilter::History).await.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_bookings_stay_with_the_user_who_made_them() {
    let (app, _) = app(&BookingConfig::default());
    app.auth.login(credentials()).await.unwrap();

    app.workflow.enter().await.unwrap();
    app.workflow
        .fill(&BookingDraft {
            name: "Ana".to_string(),
            email: "ana@x.com".to_string(),
            phone: "999".to_string(),
            date: "2025-11-05".to_string(),
            time: "08:00".to_string(),
            skill_level: "intermediate".to_string(),
            comments: String::new(),
        })
        .await
        .unwrap();
    app.workflow.submit_draft().await.unwrap();
    app.workflow.select_method(PaymentMethod::PayPal).await.unwrap();
    app.workflow.confirm_handoff().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let booked = app.lifecycle.list(BookingFilter::Upcoming).await;
    let ana = booked.iter().find(|b| b.contact.email == "ana@x.com").unwrap().id;
    assert_eq!(booked.len(), 4);

    app.auth.teardown();
    app.auth
        .register(RegistrationForm {
            name: "Luis".to_string(),
            email: "luis@x.com".to_string(),
            phone: "998".to_string(),
            password: "abc123".to_string(),
            confirm_password: "abc123".to_string(),
            skill_level: Some(SkillLevel::Advanced),
        })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let upcoming = app.lifecycle.list(BookingFilter::Upcoming).await;
    assert_eq!(upcoming.len(), 3);
    assert!(upcoming.iter().all(|b| b.contact.email == "luis@x.com"));
    assert_eq!(
        app.lifecycle.cancel(ana).await,
        Err(LifecycleError::NotFound(ana))
    );
}

fn registration(password: &str, confirm: &str) -> RegistrationForm {
    RegistrationForm {
        name: "Ana".to_string(),
        email: "ana@x.com".to_string(),
        phone: "999".to_string(),
        password: password.to_string(),
        confirm_password: confirm.to_string(),
        skill_level: Some(SkillLevel::Beginner),
    }
}

#[tokio::test(start_paused = true)]
async fn test_short_password_creates_no_session() {
    let (app, fakes) = app(&BookingConfig::default());

    let err = app.auth.register(registration("abc12", "abc12")).await.unwrap_err();

    assert!(err.to_string().starts_with("password too short"));
    assert!(app.auth.current_session().is_none());
    assert_eq!(fakes.notifier.toasts()[0].kind, ToastKind::Error);
    assert!(app.workflow.enter().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_mismatched_passwords_create_no_session() {
    let (app, fakes) = app(&BookingConfig::default());

    let err = app.auth.register(registration("abc123", "abc124")).await.unwrap_err();

    assert_eq!(err.to_string(), "passwords do not match");
    assert!(app.auth.current_session().is_none());
    assert!(fakes.navigator.views().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancelling_a_past_booking_is_not_found() {
    let mut config = BookingConfig::default();
    let dir = tempfile::tempdir().unwrap();
    config.session.file = Some(dir.path().join("session.json"));
    let (first, _) = app(&config);
    first.auth.login(credentials()).await.unwrap();
    first.shutdown(Duration::from_secs(1)).await.unwrap();

    let (app, fakes) = app(&config);
    let upcoming = app.lifecycle.list(BookingFilter::Upcoming).await;

    let err = app.lifecycle.cancel(BookingId::new(101)).await.unwrap_err();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(err, LifecycleError::NotFound(BookingId::new(101)));
    assert_eq!(app.lifecycle.list(BookingFilter::Upcoming).await, upcoming);
    assert!(fakes.notifier.events().is_empty());
}
