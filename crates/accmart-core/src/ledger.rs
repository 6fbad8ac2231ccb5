//! Ledger records for accmart.
//!
//! Every balance change leaves a `LedgerEntry`. Amounts are signed: deposits are
//! positive, purchases negative, so for every user
//! `wallet_balance == Σ amount of completed entries`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Rejection, Result};
use crate::{LedgerReference, ProductId, PurchaseId, TransactionId, UserId};

/// Smallest deposit accepted, in wallet units.
pub const MIN_DEPOSIT_AMOUNT: i64 = 100;

/// Largest deposit accepted, in wallet units.
pub const MAX_DEPOSIT_AMOUNT: i64 = 1_000_000;

/// Check a requested deposit amount against the accepted range.
///
/// # Errors
///
/// Returns `DepositTooSmall` or `DepositTooLarge` when out of range.
pub fn validate_deposit_amount(amount: i64) -> Result<i64> {
    if amount < MIN_DEPOSIT_AMOUNT {
        return Err(Rejection::DepositTooSmall {
            min: MIN_DEPOSIT_AMOUNT,
        });
    }
    if amount > MAX_DEPOSIT_AMOUNT {
        return Err(Rejection::DepositTooLarge {
            max: MAX_DEPOSIT_AMOUNT,
        });
    }
    Ok(amount)
}

/// A completed sale of one product to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    /// Purchase id.
    pub id: PurchaseId,
    /// Buyer.
    pub user_id: UserId,
    /// The sold product.
    pub product_id: ProductId,
    /// Price at the time of sale.
    pub amount: i64,
    /// When the sale committed.
    pub purchased_at: DateTime<Utc>,
}

impl Purchase {
    /// Record a sale at the given price.
    #[must_use]
    pub fn new(user_id: UserId, product_id: ProductId, amount: i64) -> Self {
        Self {
            id: PurchaseId::generate(),
            user_id,
            product_id,
            amount,
            purchased_at: Utc::now(),
        }
    }
}

/// A ledger entry (the "transaction" row).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// Entry id (ULID).
    pub id: TransactionId,
    /// Whose wallet the entry concerns.
    pub user_id: UserId,
    /// Deposit or purchase.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Signed amount in wallet units.
    pub amount: i64,
    /// Lifecycle status.
    pub status: TransactionStatus,
    /// External correlation id, unique per user.
    pub reference: LedgerReference,
    /// Free-form context (product ids, payment method).
    pub metadata: serde_json::Value,
    /// When the entry was created.
    pub created_at: DateTime<Utc>,
    /// When the status last changed.
    pub updated_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Create a pending deposit awaiting gateway confirmation.
    #[must_use]
    pub fn pending_deposit(user_id: UserId, amount: i64, reference: LedgerReference) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::generate(),
            user_id,
            kind: TransactionKind::Deposit,
            amount: amount.abs(),
            status: TransactionStatus::Pending,
            reference,
            metadata: serde_json::json!({ "method": "paystack" }),
            created_at: now,
            updated_at: now,
        }
    }

    /// Create the completed entry for a purchase. The amount is stored negative.
    #[must_use]
    pub fn purchase(purchase: &Purchase, metadata: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::generate(),
            user_id: purchase.user_id,
            kind: TransactionKind::Purchase,
            amount: -purchase.amount.abs(),
            status: TransactionStatus::Completed,
            reference: LedgerReference::for_purchase(&purchase.id),
            metadata,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the entry counts towards the wallet balance.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.status == TransactionStatus::Completed
    }
}

/// Kind of ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Funds added through the payment gateway.
    Deposit,
    /// Funds spent on a product.
    Purchase,
}

impl TransactionKind {
    /// Database and wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Purchase => "purchase",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(Self::Deposit),
            "purchase" => Ok(Self::Purchase),
            other => Err(format!("unknown transaction kind: {other}")),
        }
    }
}

/// Lifecycle of a ledger entry. Moves only from `Pending` to a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Awaiting confirmation.
    Pending,
    /// Applied to the wallet.
    Completed,
    /// Abandoned; never applied.
    Failed,
}

impl TransactionStatus {
    /// Database and wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether `self -> next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Completed | Self::Failed)
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown transaction status: {other}")),
        }
    }
}
