//! Payment settlement.
//!
//! The workflow only sees the [`PaymentGateway`] trait, so a real provider
//! (which can fail) drops in without changing the state machine.

use crate::error::SettlementError;
use crate::types::{AttemptId, Money, PaymentAttempt, PaymentMethod};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Settlement result
pub type SettlementResult = Result<SettlementReceipt, SettlementError>;

/// Proof of a settled payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementReceipt {
    /// Attempt that was settled
    pub attempt_id: AttemptId,
    /// Gateway transaction id
    pub transaction_id: String,
    /// Amount charged
    pub amount: Money,
    /// Method used
    pub method: PaymentMethod,
}

/// Payment gateway trait
///
/// Settlement resolves exactly once and must not block the caller.
pub trait PaymentGateway: Send + Sync {
    /// Settle a pending attempt
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError`] if the provider does not take the payment.
    fn settle(
        &self,
        attempt: PaymentAttempt,
    ) -> Pin<Box<dyn Future<Output = SettlementResult> + Send>>;
}

/// Gateway that waits a fixed latency and always succeeds
#[derive(Clone, Debug)]
pub struct SimulatedGateway {
    latency: Duration,
}

impl SimulatedGateway {
    /// Gateway that settles after `latency`
    #[must_use]
    pub const fn new(latency: Duration) -> Self {
        Self { latency }
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared(latency: Duration) -> Arc<dyn PaymentGateway> {
        Arc::new(Self::new(latency))
    }
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

impl PaymentGateway for SimulatedGateway {
    fn settle(
        &self,
        attempt: PaymentAttempt,
    ) -> Pin<Box<dyn Future<Output = SettlementResult> + Send>> {
        let latency = self.latency;
        Box::pin(async move {
            tokio::time::sleep(latency).await;

            let transaction_id = format!("sim_txn_{}", uuid::Uuid::new_v4());

            tracing::info!(
                attempt_id = %attempt.id,
                method = %attempt.method,
                amount = attempt.amount.cents(),
                transaction_id = %transaction_id,
                "Simulated payment settled"
            );

            Ok(SettlementReceipt {
                attempt_id: attempt.id,
                transaction_id,
                amount: attempt.amount,
                method: attempt.method,
            })
        })
    }
}
