//! PostgreSQL storage implementation.
//!
//! This module provides the `PgStore` implementation of the `Store` trait.
//! A unit of work is a database transaction; the account row is locked with
//! `SELECT ... FOR UPDATE` when loaded, and the `library_user_game_key`
//! unique constraint decides concurrent purchases of the same game.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use storefront_core::{
    Account, Game, GameId, LedgerEntry, LedgerEntryId, LedgerEntryKind, OwnershipRecord, UserId,
    WishlistEntry,
};

use crate::error::{Result, StoreError};
use crate::schema::{constraint, entity};
use crate::{
    Catalog, LedgerStore, OwnershipStore, Store, UnitOfWork, Wallet, WishlistStore,
};

type AccountRow = (Uuid, Decimal, DateTime<Utc>, DateTime<Utc>);
type GameRow = (Uuid, String, Decimal, Decimal, bool, Option<Uuid>);
type OwnershipRow = (Uuid, Uuid, Uuid, DateTime<Utc>);
type LedgerRow = (String, Uuid, Option<Uuid>, Decimal, String, String, DateTime<Utc>);

const SELECT_GAME: &str =
    "SELECT id, name, price, sale_price, is_dlc, base_game_id FROM games WHERE id = $1";

/// Transaction isolation level for units of work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IsolationLevel {
    /// PostgreSQL's default. Purchases are still safe: the account row lock
    /// serializes a user's units of work and the library unique constraint
    /// rejects duplicate ownership.
    #[default]
    ReadCommitted,

    /// Snapshot isolation.
    RepeatableRead,

    /// Full serializability. Conflicts surface as retryable database errors.
    Serializable,
}

impl IsolationLevel {
    fn set_statement(self) -> Option<&'static str> {
        match self {
            Self::ReadCommitted => None,
            Self::RepeatableRead => Some("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ"),
            Self::Serializable => Some("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE"),
        }
    }
}

impl FromStr for IsolationLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "read_committed" | "read committed" => Ok(Self::ReadCommitted),
            "repeatable_read" | "repeatable read" => Ok(Self::RepeatableRead),
            "serializable" => Ok(Self::Serializable),
            other => Err(format!("unknown isolation level: {other}")),
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ReadCommitted => "read_committed",
            Self::RepeatableRead => "repeatable_read",
            Self::Serializable => "serializable",
        })
    }
}

/// PostgreSQL-backed storage using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    isolation: IsolationLevel,
}

impl PgStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            isolation: IsolationLevel::default(),
        }
    }

    /// Connect to the database at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(classify)?;
        tracing::debug!(max_connections, "Connected to PostgreSQL");
        Ok(Self::new(pool))
    }

    /// Use `isolation` for every unit of work.
    #[must_use]
    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = isolation;
        self
    }

    /// Apply pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    async fn insert_ownership_with<'c, E>(executor: E, record: &OwnershipRecord) -> Result<()>
    where
        E: sqlx::Executor<'c, Database = Postgres>,
    {
        sqlx::query(
            "INSERT INTO library (id, user_id, game_id, acquired_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(*record.id.as_uuid())
        .bind(*record.user_id.as_uuid())
        .bind(*record.game_id.as_uuid())
        .bind(record.acquired_at)
        .execute(executor)
        .await
        .map_err(classify)?;
        Ok(())
    }
}

/// Unit of work over a [`PgStore`]: one database transaction.
struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

// =============================================================================
// Row Conversion
// =============================================================================

fn account_from_row((user_id, balance, created_at, updated_at): AccountRow) -> Account {
    Account {
        user_id: UserId::from_uuid(user_id),
        balance,
        created_at,
        updated_at,
    }
}

fn game_from_row((id, name, price, sale_price, is_dlc, base_game_id): GameRow) -> Game {
    Game {
        id: GameId::from_uuid(id),
        name,
        price,
        sale_price,
        is_dlc,
        base_game_id: base_game_id.map(GameId::from_uuid),
    }
}

fn ownership_from_row((id, user_id, game_id, acquired_at): OwnershipRow) -> OwnershipRecord {
    OwnershipRecord {
        id: id.into(),
        user_id: user_id.into(),
        game_id: game_id.into(),
        acquired_at,
    }
}

fn ledger_from_row(
    (id, user_id, game_id, amount, kind, description, created_at): LedgerRow,
) -> Result<LedgerEntry> {
    Ok(LedgerEntry {
        id: id
            .parse::<LedgerEntryId>()
            .map_err(|e| StoreError::InvalidData(format!("ledger id {id}: {e}")))?,
        user_id: user_id.into(),
        game_id: game_id.map(GameId::from_uuid),
        amount,
        kind: kind
            .parse::<LedgerEntryKind>()
            .map_err(StoreError::InvalidData)?,
        description,
        created_at,
    })
}

/// Map a `sqlx` error onto the storage taxonomy using constraint names.
fn classify(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        let message = db.message().to_string();
        match db.constraint() {
            Some(constraint::LIBRARY_USER_GAME) => {
                return StoreError::AlreadyExists {
                    entity: entity::OWNERSHIP,
                    id: message,
                }
            }
            Some(constraint::ACCOUNTS_PKEY) => {
                return StoreError::AlreadyExists {
                    entity: entity::ACCOUNT,
                    id: message,
                }
            }
            Some(constraint::LEDGER_PKEY) => {
                return StoreError::AlreadyExists {
                    entity: entity::LEDGER_ENTRY,
                    id: message,
                }
            }
            Some(constraint::ACCOUNTS_BALANCE_NON_NEGATIVE) => {
                return StoreError::Constraint(message)
            }
            Some(name) if db.is_foreign_key_violation() => {
                if name.ends_with("base_game_id_fkey") {
                    return StoreError::Constraint(message);
                }
                if name.ends_with("user_id_fkey") {
                    return StoreError::NotFound {
                        entity: entity::ACCOUNT,
                        id: message,
                    };
                }
                if name.ends_with("game_id_fkey") {
                    return StoreError::NotFound {
                        entity: entity::GAME,
                        id: message,
                    };
                }
            }
            _ => {}
        }
        if db.is_check_violation() {
            return StoreError::Constraint(message);
        }
    }
    StoreError::Database(err.to_string())
}

fn sql_limit(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

// =============================================================================
// Store
// =============================================================================

#[async_trait]
impl Catalog for PgStore {
    async fn get_game(&self, game_id: &GameId) -> Result<Option<Game>> {
        let row = sqlx::query_as::<_, GameRow>(SELECT_GAME)
            .bind(*game_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?;
        Ok(row.map(game_from_row))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let mut tx = self.pool.begin().await.map_err(classify)?;
        if let Some(statement) = self.isolation.set_statement() {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(classify)?;
        }
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    // =========================================================================
    // Read Operations
    // =========================================================================

    async fn get_account(&self, user_id: &UserId) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT user_id, balance, created_at, updated_at FROM accounts WHERE user_id = $1",
        )
        .bind(*user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;
        Ok(row.map(account_from_row))
    }

    async fn owns(&self, user_id: &UserId, game_id: &GameId) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM library WHERE user_id = $1 AND game_id = $2)",
        )
        .bind(*user_id.as_uuid())
        .bind(*game_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn wishlist_contains(&self, user_id: &UserId, game_id: &GameId) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM wishlist WHERE user_id = $1 AND game_id = $2)",
        )
        .bind(*user_id.as_uuid())
        .bind(*game_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn list_library(&self, user_id: &UserId) -> Result<Vec<OwnershipRecord>> {
        let rows = sqlx::query_as::<_, OwnershipRow>(
            "SELECT id, user_id, game_id, acquired_at FROM library \
             WHERE user_id = $1 ORDER BY acquired_at ASC",
        )
        .bind(*user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;
        Ok(rows.into_iter().map(ownership_from_row).collect())
    }

    async fn list_ledger(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerRow>(
            "SELECT id, user_id, game_id, amount, kind, description, created_at FROM ledger \
             WHERE user_id = $1 ORDER BY id DESC LIMIT $2 OFFSET $3",
        )
        .bind(*user_id.as_uuid())
        .bind(sql_limit(limit))
        .bind(sql_limit(offset))
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;
        rows.into_iter().map(ledger_from_row).collect()
    }

    // =========================================================================
    // Provisioning Operations
    // =========================================================================

    async fn put_game(&self, game: &Game) -> Result<()> {
        game.validate()
            .map_err(|e| StoreError::Constraint(e.to_string()))?;

        let mut tx = self.pool.begin().await.map_err(classify)?;

        if let Some(base_id) = game.required_base_game() {
            let base_is_dlc = sqlx::query_scalar::<_, bool>(
                "SELECT is_dlc FROM games WHERE id = $1 FOR SHARE",
            )
            .bind(*base_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(classify)?;

            match base_is_dlc {
                Some(false) => {}
                Some(true) => {
                    return Err(StoreError::Constraint(format!(
                        "base game {base_id} of {} is itself a DLC",
                        game.id
                    )))
                }
                None => {
                    return Err(StoreError::Constraint(format!(
                        "base game {base_id} of {} does not exist",
                        game.id
                    )))
                }
            }
        }

        if game.is_dlc {
            // Lock the existing row so no DLC can attach to it while it turns into one.
            sqlx::query("SELECT id FROM games WHERE id = $1 FOR UPDATE")
                .bind(*game.id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(classify)?;

            let has_dlc = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM games WHERE base_game_id = $1)",
            )
            .bind(*game.id.as_uuid())
            .fetch_one(&mut *tx)
            .await
            .map_err(classify)?;

            if has_dlc {
                return Err(StoreError::Constraint(format!(
                    "{} is the base game of existing DLC and cannot become a DLC",
                    game.id
                )));
            }
        }

        sqlx::query(
            "INSERT INTO games (id, name, price, sale_price, is_dlc, base_game_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, price = EXCLUDED.price, \
             sale_price = EXCLUDED.sale_price, is_dlc = EXCLUDED.is_dlc, \
             base_game_id = EXCLUDED.base_game_id",
        )
        .bind(*game.id.as_uuid())
        .bind(&game.name)
        .bind(game.price)
        .bind(game.sale_price)
        .bind(game.is_dlc)
        .bind(game.base_game_id.map(|id| *id.as_uuid()))
        .execute(&mut *tx)
        .await
        .map_err(classify)?;

        tx.commit().await.map_err(classify)
    }

    async fn create_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            "INSERT INTO accounts (user_id, balance, created_at, updated_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(*account.user_id.as_uuid())
        .bind(account.balance)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        Ok(())
    }

    async fn add_wishlist_entry(&self, entry: &WishlistEntry) -> Result<()> {
        sqlx::query(
            "INSERT INTO wishlist (user_id, game_id, added_at) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, game_id) DO NOTHING",
        )
        .bind(*entry.user_id.as_uuid())
        .bind(*entry.game_id.as_uuid())
        .bind(entry.added_at)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        Ok(())
    }

    async fn grant_ownership(&self, record: &OwnershipRecord) -> Result<()> {
        Self::insert_ownership_with(&self.pool, record).await
    }
}

// =============================================================================
// Unit of Work
// =============================================================================

#[async_trait]
impl Wallet for PgUnitOfWork {
    async fn load_account(&mut self, user_id: &UserId) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT user_id, balance, created_at, updated_at FROM accounts \
             WHERE user_id = $1 FOR UPDATE",
        )
        .bind(*user_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(classify)?;
        Ok(row.map(account_from_row))
    }

    async fn save_balance(&mut self, account: &Account) -> Result<()> {
        let result =
            sqlx::query("UPDATE accounts SET balance = $2, updated_at = now() WHERE user_id = $1")
                .bind(*account.user_id.as_uuid())
                .bind(account.balance)
                .execute(&mut *self.tx)
                .await
                .map_err(classify)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: entity::ACCOUNT,
                id: account.user_id.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl OwnershipStore for PgUnitOfWork {
    async fn owns(&mut self, user_id: &UserId, game_id: &GameId) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM library WHERE user_id = $1 AND game_id = $2)",
        )
        .bind(*user_id.as_uuid())
        .bind(*game_id.as_uuid())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(classify)
    }

    async fn insert_ownership(&mut self, record: &OwnershipRecord) -> Result<()> {
        PgStore::insert_ownership_with(&mut *self.tx, record).await
    }
}

#[async_trait]
impl WishlistStore for PgUnitOfWork {
    async fn has_wishlist_entry(&mut self, user_id: &UserId, game_id: &GameId) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM wishlist WHERE user_id = $1 AND game_id = $2)",
        )
        .bind(*user_id.as_uuid())
        .bind(*game_id.as_uuid())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(classify)
    }

    async fn remove_wishlist_entry(
        &mut self,
        user_id: &UserId,
        game_id: &GameId,
    ) -> Result<bool> {
        let result = sqlx::query("DELETE FROM wishlist WHERE user_id = $1 AND game_id = $2")
            .bind(*user_id.as_uuid())
            .bind(*game_id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(classify)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl LedgerStore for PgUnitOfWork {
    async fn append_ledger_entry(&mut self, entry: &LedgerEntry) -> Result<()> {
        sqlx::query(
            "INSERT INTO ledger (id, user_id, game_id, amount, kind, description, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(entry.id.to_string())
        .bind(*entry.user_id.as_uuid())
        .bind(entry.game_id.map(|id| *id.as_uuid()))
        .bind(entry.amount)
        .bind(entry.kind.as_str())
        .bind(&entry.description)
        .bind(entry.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(classify)?;
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(classify)
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.map_err(classify)
    }
}
