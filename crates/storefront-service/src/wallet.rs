//! Wallet top-ups.
//!
//! A top-up credits the balance and appends a `top_up` ledger entry in one
//! unit of work, through the same load-then-write path purchases use.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;

use storefront_core::{DomainError, LedgerEntry, LedgerEntryId, UserId};
use storefront_store::{LedgerStore, Store, StoreError, UnitOfWork, Wallet};

use crate::purchase::DEFAULT_PURCHASE_TIMEOUT;
use crate::unit_of_work::{abandon, commit_detached};

/// Errors from wallet operations.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// The amount is zero or negative.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The user has no account.
    #[error("account not found: {user_id}")]
    AccountNotFound {
        /// The user.
        user_id: UserId,
    },

    /// Storage failed; nothing was committed.
    #[error("wallet transaction failed: {source}")]
    TransactionFailed {
        /// The underlying storage error.
        #[source]
        source: StoreError,
    },
}

impl From<StoreError> for WalletError {
    fn from(source: StoreError) -> Self {
        Self::TransactionFailed { source }
    }
}

/// Outcome of a committed top-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopUpReceipt {
    /// The ledger entry recording the credit.
    pub ledger_entry_id: LedgerEntryId,
    /// Amount credited.
    pub amount: Decimal,
    /// Balance after the credit.
    pub new_balance: Decimal,
}

/// Credits wallet balances.
#[derive(Clone)]
pub struct WalletService {
    store: Arc<dyn Store>,
    timeout: Duration,
}

impl WalletService {
    /// Create a wallet service over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            timeout: DEFAULT_PURCHASE_TIMEOUT,
        }
    }

    /// Limit how long the unit of work may take before it is rolled back.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add `amount` to the user's balance.
    ///
    /// # Errors
    ///
    /// - `WalletError::InvalidAmount` unless `amount` is positive.
    /// - `WalletError::AccountNotFound` if the user has no account.
    /// - `WalletError::TransactionFailed` if storage fails.
    pub async fn top_up(
        &self,
        user_id: UserId,
        amount: Decimal,
        description: Option<String>,
    ) -> Result<TopUpReceipt, WalletError> {
        let entry = LedgerEntry::top_up(user_id, amount, description).map_err(|e| match e {
            DomainError::InvalidAmount(msg) => WalletError::InvalidAmount(msg),
            other => WalletError::InvalidAmount(other.to_string()),
        })?;

        let mut uow = self.store.begin().await?;
        let staged = tokio::time::timeout(self.timeout, stage(&mut *uow, &entry)).await;

        let new_balance = match staged {
            Ok(Ok(balance)) => balance,
            Ok(Err(e)) => {
                abandon(uow, self.timeout, "top-up rejected").await;
                return Err(e);
            }
            Err(_) => {
                abandon(uow, self.timeout, "timeout").await;
                return Err(StoreError::TimedOut(self.timeout).into());
            }
        };

        commit_detached(uow).await?;

        tracing::info!(
            user_id = %user_id,
            amount = %amount,
            new_balance = %new_balance,
            "Wallet topped up"
        );

        Ok(TopUpReceipt {
            ledger_entry_id: entry.id,
            amount,
            new_balance,
        })
    }
}

impl std::fmt::Debug for WalletService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletService")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

async fn stage(uow: &mut dyn UnitOfWork, entry: &LedgerEntry) -> Result<Decimal, WalletError> {
    let mut account = uow
        .load_account(&entry.user_id)
        .await?
        .ok_or(WalletError::AccountNotFound {
            user_id: entry.user_id,
        })?;

    let new_balance = account
        .credit(entry.amount)
        .map_err(|e| WalletError::InvalidAmount(e.to_string()))?;
    uow.save_balance(&account).await?;
    uow.append_ledger_entry(entry).await?;

    Ok(new_balance)
}
