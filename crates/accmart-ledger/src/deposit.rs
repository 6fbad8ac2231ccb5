//! Wallet funding through the payment gateway.
//!
//! A deposit is a pending ledger entry with a fresh reference. It is credited
//! exactly once, either when the user asks us to verify it or when the gateway
//! notifies us; whichever flips the entry from pending to completed first wins.

use serde::Serialize;

use accmart_core::{
    to_minor_units, validate_deposit_amount, LedgerEntry, LedgerReference, PaymentVerifier,
    Rejection, TransactionId, TransactionKind, TransactionStatus, UserId,
};
use accmart_store::{LedgerTx, Store};

use crate::Result;

/// A deposit awaiting payment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingDeposit {
    /// Id of the pending ledger entry.
    pub transaction_id: TransactionId,
    /// Reference to hand to the payment gateway.
    pub reference: LedgerReference,
    /// Amount in wallet units.
    pub amount: i64,
    /// Email the gateway should bill.
    pub email: String,
}

/// A credited deposit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositReceipt {
    /// The completed ledger entry.
    pub transaction: LedgerEntry,
    /// Wallet balance after the credit.
    pub new_balance: i64,
    /// Amount credited.
    pub amount: i64,
}

/// What a gateway notification did.
#[derive(Debug, Clone)]
pub enum Settlement {
    /// The deposit was credited by this call.
    Credited(DepositReceipt),
    /// The entry was no longer pending.
    AlreadySettled,
    /// No deposit carries this reference.
    UnknownReference,
}

/// Record a pending deposit for a user.
///
/// # Errors
///
/// Returns a rejection when the amount is out of range or the user is unknown.
pub async fn initialize_deposit(
    store: &dyn Store,
    user_id: &UserId,
    amount: i64,
) -> Result<PendingDeposit> {
    let amount = validate_deposit_amount(amount)?;
    let user = store
        .get_user(user_id)
        .await?
        .ok_or(Rejection::UserNotFound)?;

    let entry = LedgerEntry::pending_deposit(*user_id, amount, LedgerReference::generate());
    store.insert_entry(&entry).await?;

    tracing::info!(
        user_id = %user_id,
        transaction_id = %entry.id,
        reference = %entry.reference,
        amount,
        "Deposit initialized"
    );

    Ok(PendingDeposit {
        transaction_id: entry.id,
        reference: entry.reference,
        amount,
        email: user.email,
    })
}

/// Confirm a deposit with the gateway and credit the wallet.
///
/// The reference must belong to the caller and the amount must match the one
/// initialized. The gateway is asked before any transaction is opened; a
/// gateway failure leaves the deposit pending so it can be verified again.
///
/// # Errors
///
/// Returns a rejection for unknown, foreign, failed or already credited
/// references, for amount mismatches and for payments the gateway does not
/// confirm. Returns `LedgerError::Payment` when the gateway cannot be asked.
pub async fn verify_deposit(
    store: &dyn Store,
    verifier: &dyn PaymentVerifier,
    user_id: &UserId,
    reference: &LedgerReference,
    amount: i64,
) -> Result<DepositReceipt> {
    let entry = {
        let mut tx = store.begin().await?;
        tx.find_entry(user_id, reference).await?
    };
    let entry = match entry {
        Some(entry) if entry.kind == TransactionKind::Deposit => entry,
        _ => return Err(Rejection::InvalidReference.into()),
    };
    match entry.status {
        TransactionStatus::Pending => {}
        TransactionStatus::Completed => return Err(Rejection::AlreadyProcessed.into()),
        TransactionStatus::Failed => return Err(Rejection::InvalidReference.into()),
    }
    if entry.amount != amount {
        return Err(Rejection::AmountMismatch {
            expected: entry.amount,
            supplied: amount,
        }
        .into());
    }

    let verification = verifier.verify_payment(reference).await?;
    if !verification.success {
        tracing::warn!(
            user_id = %user_id,
            reference = %reference,
            "Gateway did not confirm deposit"
        );
        return Err(Rejection::PaymentNotConfirmed.into());
    }
    let expected_minor = to_minor_units(entry.amount);
    if verification.amount_paid_minor != expected_minor {
        tracing::warn!(
            user_id = %user_id,
            reference = %reference,
            expected_minor,
            paid_minor = verification.amount_paid_minor,
            "Gateway reports a different paid amount"
        );
        return Err(Rejection::PaymentAmountMismatch {
            expected_minor,
            paid_minor: verification.amount_paid_minor,
        }
        .into());
    }

    let mut tx = store.begin().await?;
    let receipt = complete(tx.as_mut(), &entry).await?;
    tx.commit().await?;

    tracing::info!(
        user_id = %user_id,
        transaction_id = %entry.id,
        amount = entry.amount,
        new_balance = receipt.new_balance,
        "Deposit verified and credited"
    );

    Ok(receipt)
}

/// Credit a deposit the gateway reported as paid.
///
/// Unknown references and entries that are no longer pending are not errors;
/// gateways redeliver notifications.
///
/// # Errors
///
/// Returns `PaymentAmountMismatch` when the paid amount differs from the
/// pending one, or a store error.
pub async fn settle_deposit(
    store: &dyn Store,
    reference: &LedgerReference,
    amount_paid_minor: i64,
) -> Result<Settlement> {
    let mut tx = store.begin().await?;

    let entry = match tx.find_entry_by_reference(reference).await? {
        Some(entry) if entry.kind == TransactionKind::Deposit => entry,
        _ => {
            tracing::warn!(reference = %reference, "Settlement for unknown reference");
            return Ok(Settlement::UnknownReference);
        }
    };
    if entry.status != TransactionStatus::Pending {
        tracing::debug!(
            reference = %reference,
            status = %entry.status,
            "Settlement for entry that is no longer pending"
        );
        return Ok(Settlement::AlreadySettled);
    }

    let expected_minor = to_minor_units(entry.amount);
    if amount_paid_minor != expected_minor {
        tracing::warn!(
            reference = %reference,
            expected_minor,
            paid_minor = amount_paid_minor,
            "Settlement amount does not match deposit"
        );
        return Err(Rejection::PaymentAmountMismatch {
            expected_minor,
            paid_minor: amount_paid_minor,
        }
        .into());
    }

    let receipt = match complete(tx.as_mut(), &entry).await {
        Ok(receipt) => receipt,
        Err(crate::LedgerError::Rejected(Rejection::AlreadyProcessed)) => {
            return Ok(Settlement::AlreadySettled);
        }
        Err(err) => return Err(err),
    };
    tx.commit().await?;

    tracing::info!(
        user_id = %entry.user_id,
        transaction_id = %entry.id,
        amount = entry.amount,
        new_balance = receipt.new_balance,
        "Deposit settled by gateway notification"
    );

    Ok(Settlement::Credited(receipt))
}

/// Flip the entry to completed and credit the wallet, in the caller's transaction.
async fn complete(tx: &mut dyn LedgerTx, entry: &LedgerEntry) -> Result<DepositReceipt> {
    let transaction = tx
        .transition_entry(
            &entry.id,
            TransactionStatus::Pending,
            TransactionStatus::Completed,
        )
        .await?
        .ok_or(Rejection::AlreadyProcessed)?;
    let new_balance = tx
        .credit_wallet(&entry.user_id, entry.amount)
        .await?
        .ok_or(Rejection::UserNotFound)?;
    Ok(DepositReceipt {
        transaction,
        new_balance,
        amount: entry.amount,
    })
}
