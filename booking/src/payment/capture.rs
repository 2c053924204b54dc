//! Method-specific credential capture.
//!
//! Credentials are free-form: only presence and shape are checked, and the
//! values never leave the process.

use crate::types::PaymentMethod;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which capture form a method uses
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureForm {
    /// Card number, expiry, CVV
    Card,
    /// Phone number and approval code from a push-payment app
    PushApp,
}

impl CaptureForm {
    /// Form for an in-place method; `None` for external methods
    #[must_use]
    pub const fn for_method(method: PaymentMethod) -> Option<Self> {
        match method {
            PaymentMethod::Card => Some(Self::Card),
            PaymentMethod::Yape | PaymentMethod::Plin => Some(Self::PushApp),
            PaymentMethod::PayPal => None,
        }
    }
}

/// Values entered into a capture form
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureFields {
    /// Card form
    Card {
        /// Card number
        number: String,
        /// Expiry, as typed
        expiry: String,
        /// Security code
        cvv: String,
    },
    /// Push-app form
    PushApp {
        /// Phone registered with the app
        phone: String,
        /// One-time approval code
        approval_code: String,
    },
}

// Credentials stay out of logs.
impl std::fmt::Debug for CaptureFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Card { .. } => f.write_str("CaptureFields::Card { .. }"),
            Self::PushApp { .. } => f.write_str("CaptureFields::PushApp { .. }"),
        }
    }
}

/// Problems with submitted capture fields
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Fields belong to a different form than the selected method uses
    #[error("{method} expects {expected:?} details")]
    WrongForm {
        /// Selected method
        method: PaymentMethod,
        /// Form the method uses
        expected: CaptureForm,
    },
    /// The method is settled externally and has no capture form
    #[error("{0} is paid through the provider's own page")]
    NotCapturable(PaymentMethod),
    /// Required entries left blank
    #[error("missing: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
}

impl CaptureFields {
    /// Empty fields for a form
    #[must_use]
    pub const fn empty(form: CaptureForm) -> Self {
        match form {
            CaptureForm::Card => Self::Card {
                number: String::new(),
                expiry: String::new(),
                cvv: String::new(),
            },
            CaptureForm::PushApp => Self::PushApp {
                phone: String::new(),
                approval_code: String::new(),
            },
        }
    }

    /// Which form these fields belong to
    #[must_use]
    pub const fn form(&self) -> CaptureForm {
        match self {
            Self::Card { .. } => CaptureForm::Card,
            Self::PushApp { .. } => CaptureForm::PushApp,
        }
    }

    /// Check the fields against the selected method
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError`] if the shape does not match the method or any
    /// entry is blank.
    pub fn check(&self, method: PaymentMethod) -> Result<(), CaptureError> {
        let expected = CaptureForm::for_method(method).ok_or(CaptureError::NotCapturable(method))?;
        if self.form() != expected {
            return Err(CaptureError::WrongForm { method, expected });
        }

        let entries: Vec<(&'static str, &str)> = match self {
            Self::Card {
                number,
                expiry,
                cvv,
            } => vec![
                ("card number", number.as_str()),
                ("expiry", expiry.as_str()),
                ("cvv", cvv.as_str()),
            ],
            Self::PushApp {
                phone,
                approval_code,
            } => vec![("phone", phone.as_str()), ("approval code", approval_code.as_str())],
        };

        let missing: Vec<&'static str> = entries
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CaptureError::Missing(missing))
        }
    }
}
