//! Database schema names.
//!
//! Constraint and entity names used by the SQL backend. Constraint names
//! are how database errors are classified into `StoreError` variants, so
//! they must match `migrations/`.

/// Constraint names.
pub mod constraint {
    /// One library entry per user and game.
    pub const LIBRARY_USER_GAME: &str = "library_user_game_key";

    /// Balances never go negative.
    pub const ACCOUNTS_BALANCE_NON_NEGATIVE: &str = "accounts_balance_non_negative";

    /// Primary key of `accounts`.
    pub const ACCOUNTS_PKEY: &str = "accounts_pkey";

    /// Primary key of `ledger`.
    pub const LEDGER_PKEY: &str = "ledger_pkey";
}

/// Entity names used in `StoreError` variants.
pub mod entity {
    /// An account row.
    pub const ACCOUNT: &str = "account";

    /// A catalog game.
    pub const GAME: &str = "game";

    /// A library entry.
    pub const OWNERSHIP: &str = "ownership";

    /// A ledger entry.
    pub const LEDGER_ENTRY: &str = "ledger entry";
}
