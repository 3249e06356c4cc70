//! Account (wallet) types.
//!
//! The account record owns the user's wallet balance. The balance is only
//! ever changed through a loaded, transaction-scoped `Account` value that is
//! written back inside the same unit of work.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};
use crate::UserId;

/// A user's wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// The user ID.
    pub user_id: UserId,

    /// Current wallet balance. Never negative once committed.
    pub balance: Decimal,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the balance was last changed.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with zero balance.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            balance: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a new account with an opening balance.
    #[must_use]
    pub fn with_balance(user_id: UserId, balance: Decimal) -> Self {
        Self {
            balance,
            ..Self::new(user_id)
        }
    }

    /// Check if the account can pay `amount`.
    #[must_use]
    pub fn has_sufficient_funds(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }

    /// Subtract `amount` from the balance and return the new balance.
    ///
    /// # Errors
    ///
    /// - `DomainError::InvalidAmount` if `amount` is negative.
    /// - `DomainError::InsufficientFunds` if the balance would go negative;
    ///   the balance is left untouched.
    pub fn debit(&mut self, amount: Decimal) -> Result<Decimal> {
        if amount < Decimal::ZERO {
            return Err(DomainError::InvalidAmount(format!(
                "debit of {amount} is negative"
            )));
        }
        if !self.has_sufficient_funds(amount) {
            return Err(DomainError::InsufficientFunds {
                balance: self.balance,
                required: amount,
            });
        }
        self.balance -= amount;
        self.updated_at = Utc::now();
        Ok(self.balance)
    }

    /// Add `amount` to the balance and return the new balance.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidAmount` unless `amount` is positive, or
    /// if the new balance would exceed the representable range. The balance
    /// is left untouched on error.
    pub fn credit(&mut self, amount: Decimal) -> Result<Decimal> {
        if amount <= Decimal::ZERO {
            return Err(DomainError::InvalidAmount(format!(
                "credit of {amount} is not positive"
            )));
        }
        self.balance = self.balance.checked_add(amount).ok_or_else(|| {
            DomainError::InvalidAmount(format!(
                "credit of {amount} overflows balance {}",
                self.balance
            ))
        })?;
        self.updated_at = Utc::now();
        Ok(self.balance)
    }
}
