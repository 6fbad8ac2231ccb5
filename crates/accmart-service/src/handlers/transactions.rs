//! Ledger history handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use accmart_core::LedgerEntry;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::ApiQuery;
use crate::state::AppState;

/// Page size when the client does not ask for one.
const DEFAULT_PAGE_SIZE: usize = 50;

/// Largest page a client may ask for.
const MAX_PAGE_SIZE: usize = 100;

/// Query parameters for listing transactions.
#[derive(Debug, Default, Deserialize)]
pub struct ListTransactionsQuery {
    /// Maximum number of transactions to return.
    pub limit: Option<usize>,
    /// Number of transactions to skip.
    pub offset: Option<usize>,
}

/// Transactions list response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsResponse {
    /// Ledger entries, newest first.
    pub transactions: Vec<LedgerEntry>,
    /// Whether more transactions are available.
    pub has_more: bool,
}

/// List the caller's ledger entries.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<ListTransactionsQuery>,
) -> Result<Json<TransactionsResponse>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0);

    // Fetch one extra row to learn whether another page exists.
    let mut transactions = state
        .store
        .list_entries_by_user(&auth.user_id, limit + 1, offset)
        .await?;
    let has_more = transactions.len() > limit;
    transactions.truncate(limit);

    Ok(Json(TransactionsResponse {
        transactions,
        has_more,
    }))
}
