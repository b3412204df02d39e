//! Local identity record storage
//!
//! The resolver finds local records by identity key and hands them back to
//! the caller; only the post-authentication hook ever writes. Storage is
//! pluggable through [`IdentityStore`]:
//!
//! - **MemoryIdentityStore**: in-process storage (tests, single-node tools)
//! - **PostgresIdentityStore**: PostgreSQL JSONB table (`postgres` feature)
//!
//! Uniqueness of identity keys is the store's job, not the resolver's.

pub mod error;
pub mod memory;
pub mod record;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use error::StoreError;
pub use memory::MemoryIdentityStore;
pub use record::IdentityRecord;

#[cfg(feature = "postgres")]
pub use postgres::{PostgresIdentityStore, PostgresStoreConfig};

use crate::identity::IdentityKey;
use async_trait::async_trait;

/// Whether a save runs the store's validation rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Run,
    Skip,
}

/// Result of looking up the record for an identity key
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// An existing, persisted record
    Found(IdentityRecord),
    /// A new in-memory record with only the key filled in; nothing is
    /// persisted until someone saves it
    Built(IdentityRecord),
}

impl Lookup {
    pub fn record(&self) -> &IdentityRecord {
        match self {
            Lookup::Found(record) | Lookup::Built(record) => record,
        }
    }

    pub fn record_mut(&mut self) -> &mut IdentityRecord {
        match self {
            Lookup::Found(record) | Lookup::Built(record) => record,
        }
    }

    pub fn into_record(self) -> IdentityRecord {
        match self {
            Lookup::Found(record) | Lookup::Built(record) => record,
        }
    }

    pub fn is_built(&self) -> bool {
        matches!(self, Lookup::Built(_))
    }
}

/// Persistence operations the resolver needs from the caller's user storage
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Find the record whose `field` equals `key`.
    async fn find_by_key(&self, field: &str, key: &IdentityKey) -> Result<Option<IdentityRecord>, StoreError>;

    /// Build an unsaved record with the key pre-filled.
    fn build(&self, field: &str, key: &IdentityKey) -> IdentityRecord {
        IdentityRecord::with_key(field, key)
    }

    /// Insert a new record or update an existing one.
    ///
    /// On insert the store assigns the record id.
    async fn save(&self, record: &mut IdentityRecord, validation: Validation) -> Result<(), StoreError>;
}

/// Look the key up, building a fresh record when none exists
pub async fn find_or_build(
    store: &dyn IdentityStore,
    field: &str,
    key: &IdentityKey,
) -> Result<Lookup, StoreError> {
    Ok(match store.find_by_key(field, key).await? {
        Some(record) => Lookup::Found(record),
        None => Lookup::Built(store.build(field, key)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_or_build_builds_without_saving() {
        let store = MemoryIdentityStore::new();
        let key = IdentityKey::new("alice@1.2.3.4");

        let lookup = find_or_build(&store, "uid", &key).await.unwrap();
        assert!(lookup.is_built());
        assert!(lookup.record().is_new());
        assert_eq!(lookup.record().get_str("uid"), Some("alice@1.2.3.4"));
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_find_or_build_finds_existing() {
        let store = MemoryIdentityStore::new();
        let key = IdentityKey::new("alice@1.2.3.4");
        let mut record = IdentityRecord::with_key("uid", &key);
        store.save(&mut record, Validation::Run).await.unwrap();

        let lookup = find_or_build(&store, "uid", &key).await.unwrap();
        assert_eq!(lookup, Lookup::Found(record));
    }
}
