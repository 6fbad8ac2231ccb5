//! Purchase handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use accmart_core::{Product, ProductId, Purchase};
use accmart_ledger::{BulkReceipt, PurchaseReceipt};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::AppState;

/// Single purchase request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    /// Product to buy.
    pub product_id: ProductId,
}

/// Cart checkout request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkPurchaseRequest {
    /// Products to buy.
    pub product_ids: Vec<ProductId>,
}

/// A purchase with the product it bought.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseWithProduct {
    /// The purchase.
    #[serde(flatten)]
    pub purchase: Purchase,
    /// The product, credentials included.
    pub product: Option<Product>,
}

/// Buy one product from the wallet.
pub async fn create_purchase(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<PurchaseRequest>,
) -> Result<(StatusCode, Json<PurchaseReceipt>), ApiError> {
    let receipt =
        accmart_ledger::purchase(state.store.as_ref(), &auth.user_id, &body.product_id).await?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Buy every available product in a cart.
pub async fn create_bulk_purchase(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<BulkPurchaseRequest>,
) -> Result<(StatusCode, Json<BulkReceipt>), ApiError> {
    let receipt =
        accmart_ledger::purchase_bulk(state.store.as_ref(), &auth.user_id, &body.product_ids)
            .await?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

/// List the caller's purchases, newest first.
pub async fn list_purchases(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<PurchaseWithProduct>>, ApiError> {
    let purchases = state.store.list_purchases_by_user(&auth.user_id).await?;

    let mut items = Vec::with_capacity(purchases.len());
    for purchase in purchases {
        let product = state.store.get_product(&purchase.product_id).await?;
        items.push(PurchaseWithProduct { purchase, product });
    }

    Ok(Json(items))
}
