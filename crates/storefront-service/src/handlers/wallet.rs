//! Wallet balance and top-up handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use storefront_core::UserId;
use storefront_store::Store;

use super::parse_user_id;
use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;
use crate::wallet::TopUpReceipt;

/// Balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// The account owner.
    pub user_id: UserId,
    /// Current balance.
    pub balance: Decimal,
    /// When the balance last changed.
    pub updated_at: DateTime<Utc>,
}

/// Get a user's wallet balance.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(user_id): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let user_id = parse_user_id(&user_id)?;

    let account = state
        .store
        .get_account(&user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            code: "account_not_found",
            message: "Account not found".into(),
        })?;

    Ok(Json(BalanceResponse {
        user_id,
        balance: account.balance,
        updated_at: account.updated_at,
    }))
}

/// Top-up request.
#[derive(Debug, Deserialize)]
pub struct TopUpRequest {
    /// Amount to add. Must be positive.
    pub amount: Decimal,
    /// Ledger description (default: "Wallet top-up").
    #[serde(default)]
    pub description: Option<String>,
}

/// Add funds to a user's wallet.
pub async fn top_up(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Path(user_id): Path<String>,
    Json(body): Json<TopUpRequest>,
) -> Result<Json<TopUpReceipt>, ApiError> {
    let user_id = parse_user_id(&user_id)?;

    tracing::debug!(
        service = %auth.service_name,
        user_id = %user_id,
        amount = %body.amount,
        "Top-up requested"
    );

    let receipt = state
        .wallet
        .top_up(user_id, body.amount, body.description)
        .await?;
    Ok(Json(receipt))
}
