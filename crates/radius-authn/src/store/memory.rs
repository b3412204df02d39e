//! In-memory identity store

use super::{IdentityRecord, IdentityStore, StoreError, Validation};
use crate::identity::IdentityKey;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use tokio::sync::RwLock;

type Validator = Arc<dyn Fn(&IdentityRecord) -> Result<(), String> + Send + Sync>;

/// In-memory identity store
///
/// Records live in a map keyed by id. Fields registered with
/// [`MemoryIdentityStore::with_unique_field`] are checked on every save,
/// whether or not validation is skipped.
///
/// # Thread Safety
///
/// Uses `tokio::sync::RwLock`; clones share the same records.
#[derive(Clone)]
pub struct MemoryIdentityStore {
    records: Arc<RwLock<BTreeMap<i64, IdentityRecord>>>,
    next_id: Arc<AtomicI64>,
    saves: Arc<AtomicUsize>,
    unique_fields: Vec<String>,
    validator: Option<Validator>,
}

impl Default for MemoryIdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
            saves: Arc::new(AtomicUsize::new(0)),
            unique_fields: Vec::new(),
            validator: None,
        }
    }

    /// Enforce uniqueness of `field` across records
    pub fn with_unique_field(mut self, field: impl Into<String>) -> Self {
        self.unique_fields.push(field.into());
        self
    }

    /// Validation rules applied on saves with [`Validation::Run`]
    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&IdentityRecord) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Number of successful saves since creation
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }

    /// Records whose `field` equals `key`
    pub async fn count_by_key(&self, field: &str, key: &IdentityKey) -> usize {
        self.records
            .read()
            .await
            .values()
            .filter(|r| r.has_key(field, key))
            .count()
    }

    pub async fn clear(&self) {
        self.records.write().await.clear();
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_by_key(&self, field: &str, key: &IdentityKey) -> Result<Option<IdentityRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records.values().find(|r| r.has_key(field, key)).cloned())
    }

    async fn save(&self, record: &mut IdentityRecord, validation: Validation) -> Result<(), StoreError> {
        if validation == Validation::Run
            && let Some(validator) = &self.validator
        {
            validator(&*record).map_err(StoreError::Invalid)?;
        }

        let mut records = self.records.write().await;

        for field in &self.unique_fields {
            let Some(value) = record.get(field) else {
                continue;
            };
            let taken = records
                .values()
                .any(|other| other.id != record.id && other.get(field) == Some(value));
            if taken {
                return Err(StoreError::Conflict(format!(
                    "{} '{}' is already taken",
                    field, value
                )));
            }
        }

        let id = match record.id {
            Some(id) if records.contains_key(&id) => id,
            Some(id) => {
                return Err(StoreError::Backend(format!("Record {} does not exist", id)));
            }
            None => self.next_id.fetch_add(1, Ordering::Relaxed),
        };
        record.id = Some(id);

        let mut stored = record.clone();
        stored.radius_attributes = None;
        records.insert(id, stored);
        self.saves.fetch_add(1, Ordering::Relaxed);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(k: &str) -> IdentityKey {
        IdentityKey::new(k)
    }

    #[tokio::test]
    async fn test_new() {
        let store = MemoryIdentityStore::new();
        assert!(store.is_empty().await);
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_update_keeps_it() {
        let store = MemoryIdentityStore::new();
        let mut record = IdentityRecord::with_key("uid", &key("a@srv"));

        store.save(&mut record, Validation::Run).await.unwrap();
        let id = record.id.unwrap();

        record.set("name", "Alice");
        store.save(&mut record, Validation::Run).await.unwrap();
        assert_eq!(record.id, Some(id));
        assert_eq!(store.len().await, 1);
        assert_eq!(store.save_count(), 2);

        let found = store.find_by_key("uid", &key("a@srv")).await.unwrap().unwrap();
        assert_eq!(found.get_str("name"), Some("Alice"));
    }

    #[tokio::test]
    async fn test_find_missing() {
        let store = MemoryIdentityStore::new();
        assert!(store.find_by_key("uid", &key("nobody")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_validator_only_runs_when_requested() {
        let store = MemoryIdentityStore::new().with_validator(|record| {
            if record.get("password_digest").is_some() {
                Ok(())
            } else {
                Err("password can't be blank".to_string())
            }
        });

        let mut record = IdentityRecord::with_key("uid", &key("a@srv"));
        let err = store.save(&mut record, Validation::Run).await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
        assert!(record.is_new());

        store.save(&mut record, Validation::Skip).await.unwrap();
        assert!(!record.is_new());
    }

    #[tokio::test]
    async fn test_unique_field_conflict() {
        let store = MemoryIdentityStore::new().with_unique_field("uid");

        let mut first = IdentityRecord::with_key("uid", &key("a@srv"));
        store.save(&mut first, Validation::Skip).await.unwrap();

        let mut second = IdentityRecord::with_key("uid", &key("a@srv"));
        let err = store.save(&mut second, Validation::Skip).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // Re-saving the same record is not a conflict
        store.save(&mut first, Validation::Skip).await.unwrap();
        assert_eq!(store.count_by_key("uid", &key("a@srv")).await, 1);
    }

    #[tokio::test]
    async fn test_radius_attributes_are_not_stored() {
        let store = MemoryIdentityStore::new();
        let mut record = IdentityRecord::with_key("uid", &key("a@srv"));
        record.radius_attributes = Some(Default::default());
        store.save(&mut record, Validation::Skip).await.unwrap();

        let found = store.find_by_key("uid", &key("a@srv")).await.unwrap().unwrap();
        assert!(found.radius_attributes.is_none());
        assert!(record.radius_attributes.is_some());
    }
}
