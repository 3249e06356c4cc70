//! Core types for the storefront purchase engine.
//!
//! This crate provides the foundational types shared by the store, service
//! and client crates:
//!
//! - **Identifiers**: `UserId`, `GameId`, `OwnershipId`, `LedgerEntryId`
//! - **Catalog**: `Game` and effective-price resolution
//! - **Wallet**: `Account`
//! - **Library**: `OwnershipRecord`, `WishlistEntry`, `PurchaseReceipt`
//! - **Ledger**: `LedgerEntry`, `LedgerEntryKind`
//!
//! # Money
//!
//! Amounts are `rust_decimal::Decimal` values. Nothing in the purchase path
//! uses floating point.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod error;
pub mod game;
pub mod ids;
pub mod ledger;
pub mod library;

pub use account::Account;
pub use error::{DomainError, Result};
pub use game::Game;
pub use ids::{GameId, IdError, LedgerEntryId, OwnershipId, UserId};
pub use ledger::{
    LedgerEntry, LedgerEntryKind, DEFAULT_PURCHASE_DESCRIPTION, DEFAULT_TOP_UP_DESCRIPTION,
};
pub use library::{OwnershipRecord, PurchaseReceipt, WishlistEntry};
pub use rust_decimal::Decimal;
