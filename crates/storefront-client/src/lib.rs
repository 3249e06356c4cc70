//! Storefront Client SDK.
//!
//! This crate provides a client library for the storefront web layer to call
//! the purchase service.
//!
//! # Example
//!
//! ```no_run
//! use storefront_client::{ClientError, StorefrontClient};
//! use storefront_core::{GameId, UserId};
//!
//! # async fn example(user_id: UserId, game_id: GameId) -> Result<(), ClientError> {
//! let client = StorefrontClient::new(
//!     "http://storefront.purchases.svc:8080",
//!     "your-service-api-key",
//! )?;
//!
//! match client.purchase(user_id, game_id).await {
//!     Ok(receipt) => println!("New balance: {}", receipt.new_balance),
//!     Err(ClientError::InsufficientFunds { balance, required }) => {
//!         println!("Top up first: have {balance}, need {required}");
//!     }
//!     Err(e) => return Err(e),
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{ClientOptions, StorefrontClient};
pub use error::ClientError;
pub use types::*;
