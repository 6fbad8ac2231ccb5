//! Webhook handler for Paystack.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use accmart_core::LedgerReference;
use accmart_ledger::{LedgerError, Settlement};

use crate::crypto::verify_signature;
use crate::error::ApiError;
use crate::paystack::{WebhookEvent, CHARGE_SUCCESS};
use crate::state::AppState;

/// Header carrying the hex HMAC-SHA512 of the body.
const SIGNATURE_HEADER: &str = "x-paystack-signature";

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the webhook was processed.
    pub received: bool,
}

/// Handle Paystack webhooks.
pub async fn paystack_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>, ApiError> {
    let Some(secret) = state.config.paystack_secret_key.as_deref() else {
        tracing::warn!("Paystack webhook received but no secret key is configured");
        return Err(ApiError::BadRequest("Webhook not configured".into()));
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("Missing Paystack signature".into()))?;

    if !verify_signature(secret, body.as_bytes(), signature) {
        tracing::warn!("Invalid Paystack webhook signature");
        return Err(ApiError::BadRequest("Invalid webhook signature".into()));
    }

    let event: WebhookEvent =
        serde_json::from_str(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    tracing::info!(event = %event.event, "Received Paystack webhook");

    if event.event == CHARGE_SUCCESS {
        handle_charge_success(&state, &event).await?;
    } else {
        tracing::debug!(event = %event.event, "Unhandled Paystack event");
    }

    Ok(Json(WebhookResponse { received: true }))
}

/// Credit the deposit a successful charge refers to.
async fn handle_charge_success(state: &AppState, event: &WebhookEvent) -> Result<(), ApiError> {
    let charge = match event.charge() {
        Ok(charge) => charge,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed charge payload in webhook");
            return Ok(());
        }
    };
    let Ok(reference) = charge.reference.parse::<LedgerReference>() else {
        tracing::warn!(reference = %charge.reference, "Malformed reference in webhook");
        return Ok(());
    };

    match accmart_ledger::settle_deposit(state.store.as_ref(), &reference, charge.amount).await
    {
        Ok(Settlement::Credited(receipt)) => {
            tracing::info!(
                reference = %reference,
                user_id = %receipt.transaction.user_id,
                amount = receipt.amount,
                new_balance = receipt.new_balance,
                "Deposit settled from webhook"
            );
        }
        Ok(Settlement::AlreadySettled) => {
            tracing::debug!(reference = %reference, "Deposit already settled");
        }
        Ok(Settlement::UnknownReference) => {
            tracing::warn!(reference = %reference, "Webhook for unknown reference");
        }
        // Acknowledged so Paystack stops redelivering; the entry stays pending for review.
        Err(LedgerError::Rejected(rejection)) => {
            tracing::warn!(
                reference = %reference,
                error = %rejection,
                "Webhook charge not applied"
            );
        }
        Err(err) => return Err(err.into()),
    }

    Ok(())
}
