//! Storefront purchase service.
//!
//! This crate provides the purchase transaction engine and a thin HTTP API
//! over it:
//!
//! - Game purchases (wallet debit, library entry, wishlist cleanup and
//!   ledger entry in one unit of work)
//! - Wallet balances and top-ups
//! - Library and ledger listings
//!
//! # Authentication
//!
//! All `/v1` routes are service-to-service and require the `X-API-Key`
//! header to match `SERVICE_API_KEY`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Health handler is async for the router

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod purchase;
pub mod routes;
pub mod state;
mod unit_of_work;
pub mod wallet;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use purchase::{
    BadgeError, BadgeEvaluator, NoopBadgeEvaluator, PurchaseEngine, PurchaseError,
    WebhookBadgeEvaluator,
};
pub use routes::create_router;
pub use state::AppState;
pub use wallet::{TopUpReceipt, WalletError, WalletService};
