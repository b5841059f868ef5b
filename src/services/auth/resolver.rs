/*
 * Responsibility
 * - 検証済みクレーム → IdentityRecord の解決 (find-or-create + 条件付き update)
 * - resolve-by 設定 (クレーム名 → モデル属性) の解釈
 * - create 競合 (unique violation) の 1 回だけの再クエリ
 */
use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::repos::error::RepoError;
use crate::services::auth::claims::ClaimSet;
use crate::services::auth::identity::IdentityRecord;
use crate::services::auth::mapper::{self, ClaimsMapping};
use crate::services::auth::store::IdentityStore;

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The resolution claim is absent from the claim set. Without it there
    /// is no stable key to tie the token to a record.
    #[error("missing '{0}' claim")]
    MissingClaim(String),

    #[error(transparent)]
    Store(#[from] RepoError),
}

/// Which claim keys the resolution and which model attribute it lands on.
///
/// `Attribute("id")` means claim key and attribute are both `id`;
/// `Pair { claim_key: "sub", attribute: "id" }` splits them. Exactly one
/// pair is active at any time.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveBy {
    Attribute(String),
    Pair { claim_key: String, attribute: String },
}

impl ResolveBy {
    pub fn claim_key(&self) -> &str {
        match self {
            Self::Attribute(name) => name,
            Self::Pair { claim_key, .. } => claim_key,
        }
    }

    pub fn attribute(&self) -> &str {
        match self {
            Self::Attribute(name) => name,
            Self::Pair { attribute, .. } => attribute,
        }
    }
}

impl Default for ResolveBy {
    fn default() -> Self {
        Self::Pair {
            claim_key: "sub".to_string(),
            attribute: "id".to_string(),
        }
    }
}

/// Resolves claim sets to identity records.
///
/// `Store` persists: find by the resolution attribute, create on first
/// sight, update only when mapped attributes actually changed.
/// `Stateless` builds the record from claims alone and never touches
/// storage (for deployments that do not persist identities).
pub enum IdentityResolver {
    Store(Arc<dyn IdentityStore>),
    Stateless,
}

impl IdentityResolver {
    pub async fn resolve(
        &self,
        claims: &ClaimSet,
        resolve_by: &ResolveBy,
        mapping: &ClaimsMapping,
    ) -> Result<IdentityRecord, ResolveError> {
        let claim_key = resolve_by.claim_key();
        let id = claims
            .get_str(claim_key)
            .ok_or_else(|| ResolveError::MissingClaim(claim_key.to_string()))?;

        let attributes = mapper::transform(claims, mapping);

        let record = match self {
            Self::Store(store) => {
                update_or_create(store.as_ref(), resolve_by.attribute(), &id, attributes).await?
            }
            Self::Stateless => {
                let mut attributes = attributes;
                attributes.insert(resolve_by.attribute().to_string(), id);
                IdentityRecord::new(attributes)
            }
        };

        Ok(record.with_claims(claims.clone()))
    }
}

async fn update_or_create(
    store: &dyn IdentityStore,
    attribute: &str,
    id: &str,
    mut attributes: BTreeMap<String, String>,
) -> Result<IdentityRecord, ResolveError> {
    if let Some(record) = store.find_one(attribute, id).await? {
        // Write only what changed; unchanged claims cost zero store traffic.
        let changed: BTreeMap<String, String> = attributes
            .into_iter()
            .filter(|(name, value)| record.attribute(name) != Some(value.as_str()))
            .collect();

        if changed.is_empty() {
            return Ok(record);
        }
        return Ok(store.update(&record, &changed).await?);
    }

    attributes.insert(attribute.to_string(), id.to_string());

    match store.create(&attributes).await {
        Ok(record) => Ok(record),
        Err(RepoError::Conflict) => {
            // Lost a create race with a concurrent request for the same new
            // id. The winner's row must exist now; anything else is a real
            // store problem.
            store
                .find_one(attribute, id)
                .await?
                .ok_or(ResolveError::Store(RepoError::Conflict))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use serde_json::json;

    use super::*;
    use crate::services::auth::store::memory::MemoryStore;

    fn claims(v: serde_json::Value) -> ClaimSet {
        serde_json::from_value(v).unwrap()
    }

    fn resolver(store: &Arc<MemoryStore>) -> IdentityResolver {
        IdentityResolver::Store(store.clone() as Arc<dyn IdentityStore>)
    }

    #[tokio::test]
    async fn creates_record_on_first_resolution() {
        let store = Arc::new(MemoryStore::new());
        let c = claims(json!({"sub": "42", "email": "a@x.com"}));

        let record = resolver(&store)
            .resolve(&c, &ResolveBy::default(), &ClaimsMapping::default())
            .await
            .unwrap();

        assert_eq!(record.attribute("id"), Some("42"));
        assert_eq!(record.attribute("email"), Some("a@x.com"));
        assert!(record.identity_id.is_some());
        assert_eq!(store.creates.load(Ordering::SeqCst), 1);
        assert_eq!(store.updates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unchanged_claims_cause_no_writes() {
        let store = Arc::new(MemoryStore::with_record(&[
            ("id", "42"),
            ("email", "a@x.com"),
        ]));
        let c = claims(json!({"sub": "42", "email": "a@x.com"}));

        let record = resolver(&store)
            .resolve(&c, &ResolveBy::default(), &ClaimsMapping::default())
            .await
            .unwrap();

        assert_eq!(record.attribute("email"), Some("a@x.com"));
        assert_eq!(store.creates.load(Ordering::SeqCst), 0);
        assert_eq!(store.updates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn changed_attributes_cause_exactly_one_update() {
        let store = Arc::new(MemoryStore::with_record(&[
            ("id", "42"),
            ("email", "old@x.com"),
            ("name", "Ann"),
        ]));
        let c = claims(json!({"sub": "42", "email": "new@x.com", "name": "Ann"}));

        let record = resolver(&store)
            .resolve(&c, &ResolveBy::default(), &ClaimsMapping::default())
            .await
            .unwrap();

        assert_eq!(record.attribute("email"), Some("new@x.com"));
        // Untouched attributes survive the merge.
        assert_eq!(record.attribute("name"), Some("Ann"));
        assert_eq!(store.updates.load(Ordering::SeqCst), 1);
        assert_eq!(store.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_resolution_claim_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        let c = claims(json!({"email": "a@x.com"}));

        let err = resolver(&store)
            .resolve(&c, &ResolveBy::default(), &ClaimsMapping::default())
            .await
            .unwrap_err();

        match err {
            ResolveError::MissingClaim(key) => assert_eq!(key, "sub"),
            other => panic!("expected MissingClaim, got: {other:?}"),
        }
        assert_eq!(store.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn custom_resolve_by_and_mapping() {
        let store = Arc::new(MemoryStore::new());
        let resolve_by = ResolveBy::Pair {
            claim_key: "sub".to_string(),
            attribute: "firebase_uid".to_string(),
        };
        let mut m = BTreeMap::new();
        m.insert("display_name".to_string(), "name".to_string());
        let mapping = ClaimsMapping::new(m);

        let c = claims(json!({"sub": "7", "name": "Ann"}));
        let record = resolver(&store)
            .resolve(&c, &resolve_by, &mapping)
            .await
            .unwrap();

        assert_eq!(record.attribute("firebase_uid"), Some("7"));
        assert_eq!(record.attribute("display_name"), Some("Ann"));
        assert_eq!(record.attribute("id"), None);
    }

    #[tokio::test]
    async fn bare_attribute_resolve_by_uses_same_key_both_sides() {
        let store = Arc::new(MemoryStore::new());
        let resolve_by = ResolveBy::Attribute("uid".to_string());

        let c = claims(json!({"uid": "abc"}));
        let record = resolver(&store)
            .resolve(&c, &resolve_by, &ClaimsMapping::default())
            .await
            .unwrap();

        assert_eq!(record.attribute("uid"), Some("abc"));
    }

    #[tokio::test]
    async fn create_conflict_requeries_and_returns_winner() {
        let store = Arc::new(MemoryStore::new());
        store.conflict_on_next_create.store(true, Ordering::SeqCst);

        let c = claims(json!({"sub": "42", "email": "a@x.com"}));
        let record = resolver(&store)
            .resolve(&c, &ResolveBy::default(), &ClaimsMapping::default())
            .await
            .unwrap();

        assert_eq!(record.attribute("id"), Some("42"));
        assert_eq!(store.creates.load(Ordering::SeqCst), 1);
        // One failed create, one row from the winning request.
        assert_eq!(store.record_count(), 1);
    }

    #[tokio::test]
    async fn numeric_subject_is_stringified() {
        let store = Arc::new(MemoryStore::new());
        let c = claims(json!({"sub": 42}));

        let record = resolver(&store)
            .resolve(&c, &ResolveBy::default(), &ClaimsMapping::default())
            .await
            .unwrap();

        assert_eq!(record.attribute("id"), Some("42"));
    }

    #[tokio::test]
    async fn stateless_mode_never_touches_storage() {
        let c = claims(json!({"sub": "42", "email": "a@x.com"}));

        let record = IdentityResolver::Stateless
            .resolve(&c, &ResolveBy::default(), &ClaimsMapping::default())
            .await
            .unwrap();

        assert_eq!(record.attribute("id"), Some("42"));
        assert_eq!(record.attribute("email"), Some("a@x.com"));
        assert!(record.identity_id.is_none());
        assert!(record.claims().is_some());
    }
}
