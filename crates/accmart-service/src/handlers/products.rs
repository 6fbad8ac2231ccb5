//! Catalogue handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use accmart_core::{ProductCredentials, ProductId, ProductListing, ProductStatus};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::ApiPath;
use crate::state::AppState;

/// A product with its credentials when the caller may see them.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    /// Public fields.
    #[serde(flatten)]
    pub listing: ProductListing,
    /// The goods, for the buyer and admins only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<ProductCredentials>,
}

/// List products that are still for sale.
pub async fn list_products(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ProductListing>>, ApiError> {
    let products = state
        .store
        .list_products(Some(ProductStatus::Available))
        .await?;

    Ok(Json(products.iter().map(|p| p.listing()).collect()))
}

/// List the distinct categories products are filed under.
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.store.list_categories().await?))
}

/// Get one product.
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<Json<ProductDetail>, ApiError> {
    let product = state
        .store
        .get_product(&product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;

    let is_admin = state
        .store
        .get_user(&auth.user_id)
        .await?
        .is_some_and(|user| user.is_admin);
    let is_buyer = !product.is_available()
        && state
            .store
            .find_purchase_by_product(&product_id)
            .await?
            .is_some_and(|purchase| purchase.user_id == auth.user_id);

    Ok(Json(ProductDetail {
        listing: product.listing(),
        credentials: (is_admin || is_buyer).then_some(product.credentials),
    }))
}
