//! Classbook - class booking and payment orchestration
//!
//! A signed-in user books a class by filling in a form, choosing a payment
//! method and paying. Payment either happens in place (card, push-app) and
//! settles through a [`payment::PaymentGateway`], or is handed off to an
//! external provider the user reports back from. A created booking is
//! recorded with the [`lifecycle::BookingLifecycleManager`], which can later
//! cancel or reschedule it.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────────┐  session   ┌──────────────────┐   record   ┌────────────────────┐
//!  │ AuthContext  │ ─────────▶ │ BookingWorkflow  │ ─────────▶ │ BookingLifecycle-  │
//!  │ (watch chan) │  sign-out  │ (reducer/store)  │  (ledger)  │ Manager (reducer)  │
//!  └──────────────┘            └──────────────────┘            └────────────────────┘
//!                                 │           │                        │
//!                        settle   ▼           ▼  staged                ▼ cancel banner,
//!                         PaymentGateway   NotificationSequencer        reschedule redirect
//! ```
//!
//! ## Booking run
//!
//! ```text
//! Gated ─Enter─▶ Collecting ─SubmitDraft─▶ MethodSelection ─SelectMethod─▶ Capturing ─SubmitPayment─▶ Settling
//!                                                             │                                          │
//!                                                             └───────────▶ Handoff ─ConfirmHandoff─▶ Success
//! ```
//!
//! Every stateful piece is a [`classbook_core::reducer::Reducer`] run by a
//! [`classbook_runtime::Store`]; timers and staged notifications are
//! `Delay` effects, so tests drive them with paused Tokio time.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod app;
pub mod auth;
pub mod config;
pub mod draft;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod mocks;
pub mod notifications;
pub mod notifier;
pub mod payment;
pub mod pricing;
pub mod types;
pub mod workflow;

pub use app::{AppError, AppPorts, ClassbookApp};
pub use auth::{AuthContext, SessionGate};
pub use config::BookingConfig;
pub use error::{AccessDenied, LifecycleError, ValidationErrors, WorkflowError};
pub use lifecycle::{BookingFilter, BookingLifecycleManager};
pub use notifications::{NotificationSequencer, Trigger};
pub use pricing::PricingCalculator;
pub use types::*;
pub use workflow::{BookingWorkflow, WorkflowAction, WorkflowPhase, WorkflowReducer, WorkflowState};
