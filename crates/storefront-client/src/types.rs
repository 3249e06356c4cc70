//! Request and response types for the storefront API.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use storefront_core::{GameId, LedgerEntry, LedgerEntryId, OwnershipRecord, UserId};

pub use storefront_core::PurchaseReceipt;

/// Purchase request.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseRequest {
    /// The buyer.
    pub user_id: UserId,
    /// The game to buy.
    pub game_id: GameId,
}

/// Wallet balance.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceResponse {
    /// The account owner.
    pub user_id: UserId,
    /// Current balance.
    pub balance: Decimal,
    /// When the balance last changed.
    pub updated_at: DateTime<Utc>,
}

/// A user's library.
#[derive(Debug, Clone, Deserialize)]
pub struct LibraryResponse {
    /// The library owner.
    pub user_id: UserId,
    /// Owned games, oldest acquisition first.
    pub games: Vec<OwnershipRecord>,
}

/// One page of ledger history.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerPage {
    /// Entries, newest first.
    pub entries: Vec<LedgerEntry>,
    /// Whether there are more entries.
    pub has_more: bool,
}

/// Top-up request.
#[derive(Debug, Clone, Serialize)]
pub struct TopUpRequest {
    /// Amount to add. Must be positive.
    pub amount: Decimal,
    /// Ledger description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Committed top-up.
#[derive(Debug, Clone, Deserialize)]
pub struct TopUpResponse {
    /// The ledger entry recording the credit.
    pub ledger_entry_id: LedgerEntryId,
    /// Amount credited.
    pub amount: Decimal,
    /// Balance after the credit.
    pub new_balance: Decimal,
}

/// API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Error details.
    pub error: ApiErrorBody,
}

/// API error body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
    /// Additional details.
    pub details: Option<serde_json::Value>,
}
