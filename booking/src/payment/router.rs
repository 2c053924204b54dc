//! Dispatch from a chosen payment method to its capture path.

use super::capture::CaptureForm;
use crate::types::PaymentMethod;

/// Where a payment method leads
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteDecision {
    /// Collect credentials in place, then settle through the gateway
    Capture {
        /// Selected method
        method: PaymentMethod,
        /// Which form to show
        form: CaptureForm,
    },
    /// Send the user to an external provider and wait for self-report
    Handoff {
        /// Selected method
        method: PaymentMethod,
        /// Provider entry point to open in a new browsing context
        entry_url: String,
    },
}

/// Stateless router from payment method to capture path
#[derive(Clone, Debug)]
pub struct PaymentMethodRouter {
    external_entry_url: String,
}

impl PaymentMethodRouter {
    /// Router whose external methods hand off to `external_entry_url`
    #[must_use]
    pub fn new(external_entry_url: impl Into<String>) -> Self {
        Self {
            external_entry_url: external_entry_url.into(),
        }
    }

    /// Options to present, in order
    #[must_use]
    pub const fn options(&self) -> [PaymentMethod; 4] {
        PaymentMethod::ALL
    }

    /// Route a selected method
    #[must_use]
    pub fn select(&self, method: PaymentMethod) -> RouteDecision {
        match method {
            PaymentMethod::PayPal => RouteDecision::Handoff {
                method,
                entry_url: self.external_entry_url.clone(),
            },
            PaymentMethod::Card => RouteDecision::Capture {
                method,
                form: CaptureForm::Card,
            },
            PaymentMethod::Yape | PaymentMethod::Plin => RouteDecision::Capture {
                method,
                form: CaptureForm::PushApp,
            },
        }
    }
}
