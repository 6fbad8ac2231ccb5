//! Admin mutations that must be checked and applied atomically.

use accmart_core::{
    ensure_admin_change_allowed, LedgerEntry, Rejection, TransactionId, TransactionStatus, User,
    UserId,
};
use accmart_store::{Store, StoreError};

use crate::Result;

/// Grant or revoke admin rights.
///
/// The admin rows are locked while the invariants are checked, so two
/// concurrent demotions cannot both pass the last-admin check.
///
/// # Errors
///
/// Returns `ProtectedAdmin` or `LastAdmin` when a demotion is refused, and
/// `StoreError::NotFound` when the target does not exist.
pub async fn set_admin_status(
    store: &dyn Store,
    target_id: &UserId,
    is_admin: bool,
    protected_emails: &[String],
) -> Result<User> {
    let mut tx = store.begin().await?;

    let admin_count = tx.count_admins().await?;
    let target = tx.get_user(target_id).await?.ok_or_else(|| StoreError::NotFound {
        entity: "user",
        id: target_id.to_string(),
    })?;
    ensure_admin_change_allowed(&target, is_admin, admin_count, protected_emails)?;

    let updated = tx
        .set_admin(target_id, is_admin)
        .await?
        .ok_or_else(|| StoreError::NotFound {
            entity: "user",
            id: target_id.to_string(),
        })?;
    tx.commit().await?;

    tracing::info!(user_id = %target_id, is_admin, "Admin status changed");
    Ok(updated)
}

/// Move a ledger entry to `status` on an admin's request.
///
/// Only pending entries may be marked failed. Completing a deposit has to go
/// through verification so the wallet is credited alongside.
///
/// # Errors
///
/// Returns `InvalidStatusTransition` for any other change and
/// `StoreError::NotFound` when the entry does not exist.
pub async fn fail_transaction(
    store: &dyn Store,
    id: &TransactionId,
    status: TransactionStatus,
) -> Result<LedgerEntry> {
    let not_found = || StoreError::NotFound {
        entity: "transaction",
        id: id.to_string(),
    };

    let mut tx = store.begin().await?;
    let entry = tx.get_entry(id).await?.ok_or_else(not_found)?;
    if status != TransactionStatus::Failed || !entry.status.can_transition_to(status) {
        return Err(Rejection::InvalidStatusTransition {
            from: entry.status,
            to: status,
        }
        .into());
    }

    let Some(updated) = tx
        .transition_entry(id, TransactionStatus::Pending, status)
        .await?
    else {
        let current = tx.get_entry(id).await?.ok_or_else(not_found)?;
        return Err(Rejection::InvalidStatusTransition {
            from: current.status,
            to: status,
        }
        .into());
    };
    tx.commit().await?;

    tracing::info!(
        transaction_id = %id,
        user_id = %updated.user_id,
        "Transaction marked failed"
    );
    Ok(updated)
}
