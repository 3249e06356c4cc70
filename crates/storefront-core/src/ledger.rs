//! Payment ledger entries.
//!
//! The ledger is append-only: entries are created inside the same unit of
//! work as the balance change they record and are never updated or deleted.
//! Summing a user's entries reproduces their balance history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};
use crate::{GameId, LedgerEntryId, UserId};

/// Description used when a purchased game has no usable name.
pub const DEFAULT_PURCHASE_DESCRIPTION: &str = "Game purchase";

/// Description used for a top-up without a caller-provided label.
pub const DEFAULT_TOP_UP_DESCRIPTION: &str = "Wallet top-up";

/// An immutable record of a monetary movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique entry ID (ULID for time-ordering).
    pub id: LedgerEntryId,

    /// The user whose balance moved.
    pub user_id: UserId,

    /// The purchased game. `None` for top-ups.
    pub game_id: Option<GameId>,

    /// Signed amount. Negative for debits.
    pub amount: Decimal,

    /// What kind of movement this is.
    pub kind: LedgerEntryKind,

    /// Human-readable description.
    pub description: String,

    /// When the entry was created.
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Create the debit entry for a game purchase.
    ///
    /// `price` is the positive effective price; the entry records `-price`.
    #[must_use]
    pub fn purchase(user_id: UserId, game_id: GameId, price: Decimal, game_name: &str) -> Self {
        let description = if game_name.trim().is_empty() {
            DEFAULT_PURCHASE_DESCRIPTION.to_string()
        } else {
            game_name.to_string()
        };

        Self {
            id: LedgerEntryId::generate(),
            user_id,
            game_id: Some(game_id),
            amount: -price.abs(),
            kind: LedgerEntryKind::Purchase,
            description,
            created_at: Utc::now(),
        }
    }

    /// Create the credit entry for a wallet top-up.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidAmount` unless `amount` is positive.
    pub fn top_up(user_id: UserId, amount: Decimal, description: Option<String>) -> Result<Self> {
        if amount <= Decimal::ZERO {
            return Err(DomainError::InvalidAmount(format!(
                "top-up of {amount} is not positive"
            )));
        }

        Ok(Self {
            id: LedgerEntryId::generate(),
            user_id,
            game_id: None,
            amount,
            kind: LedgerEntryKind::TopUp,
            description: description
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TOP_UP_DESCRIPTION.to_string()),
            created_at: Utc::now(),
        })
    }
}

/// Kind of ledger movement.
///
/// The kind is stored explicitly; consumers must not infer it from the sign
/// of the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryKind {
    /// Debit for a game purchase.
    Purchase,

    /// Funds added to the wallet.
    TopUp,
}

impl LedgerEntryKind {
    /// Stable storage name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::TopUp => "top_up",
        }
    }
}

impl std::str::FromStr for LedgerEntryKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "purchase" => Ok(Self::Purchase),
            "top_up" => Ok(Self::TopUp),
            other => Err(format!("unknown ledger entry kind: {other}")),
        }
    }
}
