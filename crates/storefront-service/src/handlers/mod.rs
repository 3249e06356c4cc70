//! API handlers.

pub mod health;
pub mod library;
pub mod purchases;
pub mod wallet;

use std::str::FromStr;

use storefront_core::{DomainError, IdError, UserId};

use crate::error::ApiError;

/// Parse an identifier from a path or body field.
fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = IdError>,
{
    raw.parse().map_err(|e| DomainError::InvalidId(e).into())
}

/// Parse a user ID from a path or body field.
fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    parse_id(raw)
}
