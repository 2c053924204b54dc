//! Payment routing, capture and settlement.
//!
//! ```text
//! select(method) ──► Capture { form } ──► fields ──► PaymentGateway::settle
//!                └─► Handoff { entry_url } ──► user self-reports completion
//! ```

pub mod capture;
pub mod gateway;
pub mod router;

pub use capture::{CaptureError, CaptureFields, CaptureForm};
pub use gateway::{PaymentGateway, SettlementReceipt, SettlementResult, SimulatedGateway};
pub use router::{PaymentMethodRouter, RouteDecision};
