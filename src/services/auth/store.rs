//! Identity store interface used by the resolver.
use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::repos::error::RepoError;
use crate::services::auth::identity::IdentityRecord;

/// A minimal persistence interface for identity records.
///
/// This is intentionally small and attribute-based:
/// - Resolution only needs find-by-attribute plus create/update.
/// - Uniqueness of the resolution attribute is the store's job; the resolver
///   relies on `create` surfacing `RepoError::Conflict` when two requests
///   race on the same new identity.
///
/// Implementations are shared across requests and must be internally
/// synchronized (typically a connection pool inside).
#[async_trait]
pub trait IdentityStore: Send + Sync {
    // Fetch the single record whose `attribute` equals `value`, if any.
    async fn find_one(
        &self,
        attribute: &str,
        value: &str,
    ) -> Result<Option<IdentityRecord>, RepoError>;

    // Persist a new record built from `attributes`.
    async fn create(
        &self,
        attributes: &BTreeMap<String, String>,
    ) -> Result<IdentityRecord, RepoError>;

    // Merge `attributes` into an existing record and persist the result.
    async fn update(
        &self,
        record: &IdentityRecord,
        attributes: &BTreeMap<String, String>,
    ) -> Result<IdentityRecord, RepoError>;
}

#[cfg(test)]
pub(crate) mod memory {
    //! In-memory store with call counters, for resolver/guard tests.
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use uuid::Uuid;

    use super::*;

    #[derive(Default)]
    pub struct MemoryStore {
        records: Mutex<Vec<IdentityRecord>>,
        pub finds: AtomicUsize,
        pub creates: AtomicUsize,
        pub updates: AtomicUsize,
        // Simulates losing a create race: the next create fails with
        // Conflict and the row appears as if another request won.
        pub conflict_on_next_create: AtomicBool,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_record(attributes: &[(&str, &str)]) -> Self {
            let store = Self::default();
            store.insert(attributes);
            store
        }

        pub fn insert(&self, attributes: &[(&str, &str)]) {
            let attrs: BTreeMap<String, String> = attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            let mut record = IdentityRecord::new(attrs);
            record.identity_id = Some(Uuid::new_v4());
            self.records.lock().unwrap().push(record);
        }

        pub fn record_count(&self) -> usize {
            self.records.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl IdentityStore for MemoryStore {
        async fn find_one(
            &self,
            attribute: &str,
            value: &str,
        ) -> Result<Option<IdentityRecord>, RepoError> {
            self.finds.fetch_add(1, Ordering::SeqCst);
            let records = self.records.lock().unwrap();
            Ok(records
                .iter()
                .find(|r| r.attribute(attribute) == Some(value))
                .cloned())
        }

        async fn create(
            &self,
            attributes: &BTreeMap<String, String>,
        ) -> Result<IdentityRecord, RepoError> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            if self.conflict_on_next_create.swap(false, Ordering::SeqCst) {
                // The racing request's row becomes visible.
                let mut record = IdentityRecord::new(attributes.clone());
                record.identity_id = Some(Uuid::new_v4());
                self.records.lock().unwrap().push(record);
                return Err(RepoError::Conflict);
            }

            let mut record = IdentityRecord::new(attributes.clone());
            record.identity_id = Some(Uuid::new_v4());
            self.records.lock().unwrap().push(record.clone());
            Ok(record)
        }

        async fn update(
            &self,
            record: &IdentityRecord,
            attributes: &BTreeMap<String, String>,
        ) -> Result<IdentityRecord, RepoError> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            let id = record.identity_id.ok_or(RepoError::Unsaved)?;

            let mut records = self.records.lock().unwrap();
            let stored = records
                .iter_mut()
                .find(|r| r.identity_id == Some(id))
                .ok_or(RepoError::Unsaved)?;
            stored
                .attributes
                .extend(attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
            Ok(stored.clone())
        }
    }
}
