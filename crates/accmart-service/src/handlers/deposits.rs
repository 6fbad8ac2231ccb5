//! Deposit handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use accmart_core::{LedgerEntry, LedgerReference};
use accmart_ledger::PendingDeposit;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::AppState;

/// Deposit initialization request.
#[derive(Debug, Deserialize)]
pub struct InitializeDepositRequest {
    /// Amount in wallet units.
    pub amount: i64,
}

/// Deposit verification request.
#[derive(Debug, Deserialize)]
pub struct VerifyDepositRequest {
    /// Reference returned by initialization.
    pub reference: LedgerReference,
    /// Amount the client initialized.
    pub amount: i64,
}

/// Deposit verification response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyDepositResponse {
    /// Confirmation message.
    pub message: String,
    /// Wallet balance after the credit.
    pub new_balance: i64,
    /// Amount credited.
    pub amount: i64,
    /// The completed ledger entry.
    pub transaction: LedgerEntry,
}

/// Start a deposit. The client pays through Paystack with the returned reference.
pub async fn initialize_deposit(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<InitializeDepositRequest>,
) -> Result<Json<PendingDeposit>, ApiError> {
    let pending =
        accmart_ledger::initialize_deposit(state.store.as_ref(), &auth.user_id, body.amount)
            .await?;

    Ok(Json(pending))
}

/// Confirm a deposit with Paystack and credit the wallet.
pub async fn verify_deposit(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<VerifyDepositRequest>,
) -> Result<Json<VerifyDepositResponse>, ApiError> {
    let receipt = accmart_ledger::verify_deposit(
        state.store.as_ref(),
        state.payments.as_ref(),
        &auth.user_id,
        &body.reference,
        body.amount,
    )
    .await?;

    Ok(Json(VerifyDepositResponse {
        message: "Deposit verified successfully".to_string(),
        new_balance: receipt.new_balance,
        amount: receipt.amount,
        transaction: receipt.transaction,
    }))
}
