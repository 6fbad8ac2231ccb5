//! Money-moving operations for accmart.
//!
//! Every operation that reads wallet or inventory state and then writes it runs
//! inside one [`LedgerTx`](accmart_store::LedgerTx). Conditional updates are the
//! only concurrency control: whoever's `UPDATE … WHERE` matches the row wins,
//! everyone else gets a [`Rejection`] and their transaction is dropped.
//!
//! # Operations
//!
//! - [`purchase`] and [`purchase_bulk`]: buy one product or a cart.
//! - [`initialize_deposit`], [`verify_deposit`] and [`settle_deposit`]: fund a wallet.
//! - [`set_admin_status`] and [`fail_transaction`]: the admin mutations.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod admin;
pub mod deposit;
pub mod purchase;

pub use admin::{fail_transaction, set_admin_status};
pub use deposit::{
    initialize_deposit, settle_deposit, verify_deposit, DepositReceipt, PendingDeposit,
    Settlement,
};
pub use purchase::{purchase, purchase_bulk, BulkReceipt, PurchaseReceipt};

use accmart_core::{PaymentError, Rejection};
use accmart_store::StoreError;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Why a ledger operation did not complete.
///
/// Whatever the variant, nothing the operation wrote was committed.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Refused on business grounds.
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// The payment gateway could not answer.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// The database failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// The rejection, if this is a business refusal.
    #[must_use]
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }
}
