//! User profile handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use accmart_core::{User, UserId, UserProfile};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::AppState;

/// The caller's own profile and wallet.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    /// User ID.
    pub id: UserId,
    /// Sign-in email.
    pub email: String,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Avatar URL.
    pub profile_image_url: Option<String>,
    /// Wallet balance in wallet units.
    pub wallet_balance: i64,
    /// Whether the user is an admin.
    pub is_admin: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            profile_image_url: user.profile_image_url,
            wallet_balance: user.wallet_balance,
            is_admin: user.is_admin,
        }
    }
}

/// Profile fields sent on sign-in.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncUserRequest {
    /// Sign-in email. Falls back to the token's email claim.
    pub email: Option<String>,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Avatar URL.
    pub profile_image_url: Option<String>,
}

/// Create the caller's user record, or refresh its profile.
pub async fn sync_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<SyncUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let email = match body.email.or(auth.email) {
        Some(email) => email,
        None => state
            .store
            .get_user(&auth.user_id)
            .await?
            .map(|user| user.email)
            .ok_or_else(|| ApiError::BadRequest("Email is required".into()))?,
    };
    if email.trim().is_empty() {
        return Err(ApiError::BadRequest("Email is required".into()));
    }

    let user = state
        .store
        .sync_user(UserProfile {
            id: auth.user_id,
            email,
            first_name: body.first_name,
            last_name: body.last_name,
            profile_image_url: body.profile_image_url,
        })
        .await?;

    tracing::debug!(user_id = %user.id, "User synced");

    Ok(Json(user.into()))
}

/// Get the caller's profile and wallet balance.
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .store
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(user.into()))
}
