//! Business-rule rejections for accmart.
//!
//! A `Rejection` is an expected outcome of a purchase, deposit or admin operation,
//! not a fault. Its `Display` text is the human-readable message returned to the
//! client; `code()` is the stable machine-readable form.

use crate::ledger::TransactionStatus;

/// Result type for operations that can be refused on business grounds.
pub type Result<T> = std::result::Result<T, Rejection>;

/// Reasons a marketplace operation was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// The acting user has never been synced.
    #[error("User not found")]
    UserNotFound,

    /// No product with the requested id.
    #[error("Product not found")]
    ProductNotFound,

    /// The product exists but is already sold.
    #[error("Product not available")]
    ProductNotAvailable,

    /// Another request sold the product between our read and our update.
    #[error("Product was just purchased by another user")]
    PurchasedConcurrently,

    /// The wallet cannot cover the price.
    #[error("Insufficient wallet balance")]
    InsufficientBalance {
        /// Current wallet balance.
        balance: i64,
        /// Amount the operation needed.
        required: i64,
    },

    /// A cart with no ids at all.
    #[error("At least one product required")]
    EmptyCart,

    /// None of the products in a cart could be bought.
    #[error("No available products in cart")]
    NoAvailableProducts,

    /// Deposit below the minimum.
    #[error("Minimum deposit is {min}")]
    DepositTooSmall {
        /// Smallest accepted amount.
        min: i64,
    },

    /// Deposit above the maximum.
    #[error("Maximum deposit is {max}")]
    DepositTooLarge {
        /// Largest accepted amount.
        max: i64,
    },

    /// No deposit of the caller matches the reference, or it already failed.
    #[error("Invalid transaction reference")]
    InvalidReference,

    /// The caller claimed a different amount than the one initialized.
    #[error("Amount mismatch with pending transaction")]
    AmountMismatch {
        /// Amount stored on the pending entry.
        expected: i64,
        /// Amount the caller supplied.
        supplied: i64,
    },

    /// The gateway does not report the payment as successful.
    #[error("Payment verification failed")]
    PaymentNotConfirmed,

    /// The gateway reports a different paid amount.
    #[error("Payment amount mismatch")]
    PaymentAmountMismatch {
        /// Minor units the deposit requires.
        expected_minor: i64,
        /// Minor units the gateway reports as paid.
        paid_minor: i64,
    },

    /// The deposit was already credited.
    #[error("Deposit already processed")]
    AlreadyProcessed,

    /// Product price must be a positive amount.
    #[error("Price must be a positive whole number")]
    InvalidPrice,

    /// Product price above the listing ceiling.
    #[error("Price cannot exceed {max}")]
    PriceTooHigh {
        /// Highest accepted price.
        max: i64,
    },

    /// The target is a protected admin.
    #[error("This admin account is protected and cannot be removed from admin position")]
    ProtectedAdmin,

    /// Demoting the target would leave no admin.
    #[error("Cannot remove the last remaining admin")]
    LastAdmin,

    /// Ledger status only moves forward from pending.
    #[error("Cannot change transaction status from {from} to {to}")]
    InvalidStatusTransition {
        /// Current status.
        from: TransactionStatus,
        /// Requested status.
        to: TransactionStatus,
    },
}

impl Rejection {
    /// Machine-readable code for API responses.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UserNotFound => "user_not_found",
            Self::ProductNotFound => "product_not_found",
            Self::ProductNotAvailable => "product_not_available",
            Self::PurchasedConcurrently => "purchased_concurrently",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::EmptyCart => "empty_cart",
            Self::NoAvailableProducts => "no_available_products",
            Self::DepositTooSmall { .. } | Self::DepositTooLarge { .. } => "invalid_amount",
            Self::InvalidReference => "invalid_reference",
            Self::AmountMismatch { .. } => "amount_mismatch",
            Self::PaymentNotConfirmed => "payment_not_confirmed",
            Self::PaymentAmountMismatch { .. } => "payment_amount_mismatch",
            Self::AlreadyProcessed => "already_processed",
            Self::InvalidPrice | Self::PriceTooHigh { .. } => "invalid_price",
            Self::ProtectedAdmin => "protected_admin",
            Self::LastAdmin => "last_admin",
            Self::InvalidStatusTransition { .. } => "invalid_status_transition",
        }
    }

    /// Whether the rejection concerns admin permissions rather than input.
    #[must_use]
    pub const fn is_forbidden(&self) -> bool {
        matches!(self, Self::ProtectedAdmin | Self::LastAdmin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_client_contract() {
        assert_eq!(
            Rejection::InsufficientBalance {
                balance: 1,
                required: 2
            }
            .to_string(),
            "Insufficient wallet balance"
        );
        assert_eq!(
            Rejection::AmountMismatch {
                expected: 1000,
                supplied: 2000
            }
            .to_string(),
            "Amount mismatch with pending transaction"
        );
        assert_eq!(
            Rejection::DepositTooSmall { min: 100 }.to_string(),
            "Minimum deposit is 100"
        );
    }

    #[test]
    fn admin_rejections_are_forbidden() {
        assert!(Rejection::ProtectedAdmin.is_forbidden());
        assert!(Rejection::LastAdmin.is_forbidden());
        assert!(!Rejection::AlreadyProcessed.is_forbidden());
    }
}
