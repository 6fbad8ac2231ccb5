//! Admin handlers.
//!
//! Every handler takes an [`AdminUser`], so a caller whose stored account is not
//! an admin gets a 403 before the handler runs.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use accmart_core::{
    LedgerEntry, NewProduct, Product, Purchase, TransactionId, TransactionKind,
    TransactionStatus, User, UserId,
};
use accmart_store::ProductCounts;

use crate::auth::AdminUser;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

/// Admin-status change request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatusRequest {
    /// Whether the user should be an admin.
    pub is_admin: bool,
}

/// Ledger status change request.
#[derive(Debug, Deserialize)]
pub struct TransactionStatusRequest {
    /// The new status. Only `failed` is accepted.
    pub status: TransactionStatus,
}

/// List all users.
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.store.list_users().await?))
}

/// Promote or demote a user.
pub async fn set_admin_status(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    ApiPath(user_id): ApiPath<UserId>,
    ApiJson(body): ApiJson<AdminStatusRequest>,
) -> Result<Json<User>, ApiError> {
    let user = accmart_ledger::set_admin_status(
        state.store.as_ref(),
        &user_id,
        body.is_admin,
        &state.config.protected_admin_emails,
    )
    .await?;

    tracing::info!(
        admin_id = %admin.user.id,
        user_id = %user_id,
        is_admin = body.is_admin,
        "Admin changed admin status"
    );

    Ok(Json(user))
}

/// Product counts by status.
pub async fn stats(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Json<ProductCounts>, ApiError> {
    Ok(Json(state.store.product_counts().await?))
}

/// List every product, credentials included.
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.store.list_products(None).await?))
}

/// List a new product for sale.
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    ApiJson(body): ApiJson<NewProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    if body.title.trim().is_empty() || body.category.trim().is_empty() {
        return Err(ApiError::BadRequest("Title and category are required".into()));
    }

    let product = body.into_product()?;
    state.store.insert_product(&product).await?;

    tracing::info!(
        admin_id = %admin.user.id,
        product_id = %product.id,
        price = product.price,
        "Product created"
    );

    Ok((StatusCode::CREATED, Json(product)))
}

/// List every deposit entry.
pub async fn list_deposits(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Json<Vec<LedgerEntry>>, ApiError> {
    Ok(Json(
        state
            .store
            .list_entries(Some(TransactionKind::Deposit))
            .await?,
    ))
}

/// List every purchase.
pub async fn list_purchases(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Json<Vec<Purchase>>, ApiError> {
    Ok(Json(state.store.list_purchases().await?))
}

/// Mark a pending ledger entry as failed.
pub async fn update_transaction_status(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    ApiPath(transaction_id): ApiPath<TransactionId>,
    ApiJson(body): ApiJson<TransactionStatusRequest>,
) -> Result<Json<LedgerEntry>, ApiError> {
    let entry =
        accmart_ledger::fail_transaction(state.store.as_ref(), &transaction_id, body.status)
            .await?;

    tracing::info!(
        admin_id = %admin.user.id,
        transaction_id = %transaction_id,
        status = %entry.status,
        "Admin changed transaction status"
    );

    Ok(Json(entry))
}
