//! Identifier types for the storefront.
//!
//! This module provides strongly-typed identifiers for users, games, library
//! entries and ledger entries.
//!
//! # Macro-based ID Types
//!
//! The `uuid_id_type!` macro reduces boilerplate for UUID-based identifier types,
//! ensuring consistent implementation of serialization, parsing, and display traits.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Macro to define a UUID-based identifier type with standard trait implementations.
///
/// This macro generates a newtype wrapper around `uuid::Uuid` with implementations for:
/// - `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - `Serialize`, `Deserialize` (as string)
/// - `FromStr`, `Display`, `Debug`
/// - `TryFrom<String>`, `Into<String>`, `From<Uuid>`
///
/// # Example
///
/// ```ignore
/// uuid_id_type!(MyId, "A custom identifier type.");
/// let id = MyId::generate();
/// let parsed: MyId = id.to_string().parse().unwrap();
/// ```
macro_rules! uuid_id_type {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Create a new identifier from a UUID.
            #[must_use]
            pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Generate a new random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Return the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = uuid::Uuid::parse_str(s).map_err(|_| IdError::InvalidUuid)?;
                Ok(Self(uuid))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0.to_string()
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

uuid_id_type!(UserId, "A user (account) identifier.\n\nUser rows are owned by the surrounding platform; this core only reads and debits their balance.");
uuid_id_type!(GameId, "A catalog game identifier.\n\nDLC records use the same identifier space as base games.");
uuid_id_type!(OwnershipId, "Surrogate identifier of a library entry (ownership record).");

/// A ledger entry identifier using ULID for time-ordering.
///
/// Ledger entry IDs are time-ordered so that a user's ledger sorts
/// chronologically by ID.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LedgerEntryId(Ulid);

impl LedgerEntryId {
    /// Create a new `LedgerEntryId` from a ULID.
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// Generate a new `LedgerEntryId` with the current timestamp.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    /// Return the underlying ULID.
    #[must_use]
    pub const fn as_ulid(&self) -> &Ulid {
        &self.0
    }
}

impl FromStr for LedgerEntryId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ulid = Ulid::from_string(s).map_err(|_| IdError::InvalidUlid)?;
        Ok(Self(ulid))
    }
}

impl fmt::Debug for LedgerEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LedgerEntryId({})", self.0)
    }
}

impl fmt::Display for LedgerEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for LedgerEntryId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LedgerEntryId> for String {
    fn from(id: LedgerEntryId) -> Self {
        id.0.to_string()
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not a valid UUID.
    #[error("invalid UUID format")]
    InvalidUuid,

    /// The input is not a valid ULID.
    #[error("invalid ULID format")]
    InvalidUlid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_parses_its_display_form() {
        let id = UserId::generate();
        let parsed = UserId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn game_id_serializes_as_plain_string() {
        let id = GameId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }

    #[test]
    fn game_id_rejects_garbage() {
        assert_eq!(GameId::from_str("not-a-uuid"), Err(IdError::InvalidUuid));
        let result: Result<GameId, _> = serde_json::from_str("\"nope\"");
        assert!(result.is_err());
    }

    #[test]
    fn debug_includes_type_name() {
        let id = OwnershipId::generate();
        assert!(format!("{id:?}").starts_with("OwnershipId("));
    }

    #[test]
    fn ledger_entry_ids_sort_by_creation_time() {
        let first = LedgerEntryId::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = LedgerEntryId::generate();
        assert!(first < second);
    }

    #[test]
    fn ledger_entry_id_rejects_uuid_text() {
        let uuid = uuid::Uuid::new_v4().to_string();
        assert_eq!(
            LedgerEntryId::from_str(&uuid),
            Err(IdError::InvalidUlid)
        );
    }
}
