//! Purchase handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use storefront_core::{GameId, PurchaseReceipt};

use super::{parse_id, parse_user_id};
use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Purchase request.
#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    /// The buyer.
    pub user_id: String,
    /// The game to buy.
    pub game_id: String,
}

/// Purchase a game for a user.
pub async fn create_purchase(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<PurchaseRequest>,
) -> Result<Json<PurchaseReceipt>, ApiError> {
    let user_id = parse_user_id(&body.user_id)?;
    let game_id: GameId = parse_id(&body.game_id)?;

    tracing::debug!(
        service = %auth.service_name,
        user_id = %user_id,
        game_id = %game_id,
        "Purchase requested"
    );

    let receipt = state.purchases.purchase(user_id, game_id).await?;
    Ok(Json(receipt))
}
