//! Catalog game records.
//!
//! Games are read-only for the purchase engine. The only computation done
//! here is resolving which stored price applies to a purchase attempt.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};
use crate::GameId;

/// A catalog entry that can be purchased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    /// Catalog identifier.
    pub id: GameId,

    /// Display name, also used as the ledger description of a purchase.
    pub name: String,

    /// Base list price.
    pub price: Decimal,

    /// Current discounted price. Zero means "no discount".
    pub sale_price: Decimal,

    /// Whether this record is downloadable content for another game.
    pub is_dlc: bool,

    /// The base game a DLC extends. Always `Some` for DLC.
    pub base_game_id: Option<GameId>,
}

impl Game {
    /// Create a base (non-DLC) game without a discount.
    #[must_use]
    pub fn new(name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: GameId::generate(),
            name: name.into(),
            price,
            sale_price: Decimal::ZERO,
            is_dlc: false,
            base_game_id: None,
        }
    }

    /// Create a DLC for `base_game_id`.
    #[must_use]
    pub fn dlc(name: impl Into<String>, price: Decimal, base_game_id: GameId) -> Self {
        Self {
            is_dlc: true,
            base_game_id: Some(base_game_id),
            ..Self::new(name, price)
        }
    }

    /// Set the discounted sale price.
    #[must_use]
    pub fn with_sale_price(mut self, sale_price: Decimal) -> Self {
        self.sale_price = sale_price;
        self
    }

    /// The price actually charged: the sale price when positive, otherwise
    /// the list price.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        if self.sale_price > Decimal::ZERO {
            self.sale_price
        } else {
            self.price
        }
    }

    /// Whether acquiring this game moves no money.
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.effective_price().is_zero()
    }

    /// The base game a purchaser must already own, if any.
    #[must_use]
    pub fn required_base_game(&self) -> Option<GameId> {
        if self.is_dlc {
            self.base_game_id
        } else {
            None
        }
    }

    /// Check the record-local catalog invariants.
    ///
    /// Whether the referenced base game exists and is itself not a DLC can
    /// only be checked against the catalog; stores do that on insert.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidGame` if a price is negative or the DLC
    /// reference is missing or points at the game itself.
    pub fn validate(&self) -> Result<()> {
        if self.price < Decimal::ZERO {
            return Err(DomainError::InvalidGame(format!(
                "{}: list price {} is negative",
                self.id, self.price
            )));
        }
        if self.sale_price < Decimal::ZERO {
            return Err(DomainError::InvalidGame(format!(
                "{}: sale price {} is negative",
                self.id, self.sale_price
            )));
        }
        match (self.is_dlc, self.base_game_id) {
            (true, None) => Err(DomainError::InvalidGame(format!(
                "{}: DLC without a base game",
                self.id
            ))),
            (true, Some(base)) if base == self.id => Err(DomainError::InvalidGame(format!(
                "{}: DLC cannot extend itself",
                self.id
            ))),
            _ => Ok(()),
        }
    }
}
