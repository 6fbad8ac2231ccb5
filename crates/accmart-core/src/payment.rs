//! The seam to the external payment gateway.
//!
//! The deposit engine only needs one question answered: for this reference, did
//! the payment succeed and how much was paid? Anything that can answer it
//! implements [`PaymentVerifier`].

use async_trait::async_trait;

use crate::LedgerReference;

/// Gateway minor units per wallet unit (kobo per naira).
pub const MINOR_UNITS_PER_UNIT: i64 = 100;

/// What the gateway reports for a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentVerification {
    /// Whether the gateway considers the payment successful.
    pub success: bool,
    /// Amount paid, in gateway minor units.
    pub amount_paid_minor: i64,
}

/// Errors reaching or understanding the gateway.
///
/// These are infrastructure failures, not refusals: a pending deposit stays
/// pending and can be verified again later.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// The gateway is not configured for this deployment.
    #[error("payment gateway not configured")]
    NotConfigured,

    /// The gateway could not be reached.
    #[error("payment gateway unreachable: {0}")]
    Unreachable(String),

    /// The gateway answered with something we could not interpret.
    #[error("unexpected payment gateway response: {0}")]
    InvalidResponse(String),
}

/// Verifies payments by reference with an external gateway.
#[async_trait]
pub trait PaymentVerifier: Send + Sync {
    /// Ask the gateway about a payment.
    ///
    /// # Errors
    ///
    /// Returns a `PaymentError` when the gateway cannot give an answer.
    async fn verify_payment(
        &self,
        reference: &LedgerReference,
    ) -> Result<PaymentVerification, PaymentError>;
}

/// Convert a wallet amount to gateway minor units.
#[must_use]
pub const fn to_minor_units(amount: i64) -> i64 {
    amount.saturating_mul(MINOR_UNITS_PER_UNIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minor_unit_conversion() {
        assert_eq!(to_minor_units(1000), 100_000);
        assert_eq!(to_minor_units(i64::MAX), i64::MAX);
    }
}
