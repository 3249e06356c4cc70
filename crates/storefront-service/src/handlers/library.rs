//! Library and ledger handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use storefront_core::{LedgerEntry, OwnershipRecord, UserId};
use storefront_store::Store;

use super::parse_user_id;
use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Largest page the ledger endpoint returns.
const MAX_LEDGER_PAGE: usize = 100;

/// Library response.
#[derive(Debug, Serialize)]
pub struct LibraryResponse {
    /// The library owner.
    pub user_id: UserId,
    /// Owned games, oldest acquisition first.
    pub games: Vec<OwnershipRecord>,
}

/// List the games a user owns.
pub async fn list_library(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(user_id): Path<String>,
) -> Result<Json<LibraryResponse>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    let games = state.store.list_library(&user_id).await?;
    Ok(Json(LibraryResponse { user_id, games }))
}

/// Ledger query parameters.
#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    /// Maximum number of entries to return (default: 50, max: 100).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// Ledger response.
#[derive(Debug, Serialize)]
pub struct LedgerResponse {
    /// Entries, newest first.
    pub entries: Vec<LedgerEntry>,
    /// Whether there are more entries.
    pub has_more: bool,
}

/// List a user's ledger entries.
pub async fn list_ledger(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(user_id): Path<String>,
    Query(query): Query<LedgerQuery>,
) -> Result<Json<LedgerResponse>, ApiError> {
    let user_id = parse_user_id(&user_id)?;

    state
        .store
        .get_account(&user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            code: "account_not_found",
            message: "Account not found".into(),
        })?;

    // Fetch one more than requested to determine has_more
    let limit = query.limit.min(MAX_LEDGER_PAGE);
    let mut entries = state
        .store
        .list_ledger(&user_id, limit + 1, query.offset)
        .await?;

    let has_more = entries.len() > limit;
    entries.truncate(limit);

    Ok(Json(LedgerResponse { entries, has_more }))
}
