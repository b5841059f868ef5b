/*
 * Responsibility
 * - 解決済みアイデンティティ (IdentityRecord) の型
 * - claims / raw token は解決後に attach されるだけで永続化されない
 * - password / remember-token 系は未サポートとして必ず失敗させる
 */
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::services::auth::claims::ClaimSet;

/// Raised when a caller attempts an authentication feature this system
/// deliberately does not provide. Always fatal; never caught internally.
#[derive(Debug, Error)]
#[error("unsupported operation: {0}")]
pub struct UnsupportedOperation(pub &'static str);

/// A persisted identity resolved from a verified claim set.
///
/// `identity_id` is the store-assigned opaque key (`None` for records
/// resolved in stateless mode, which never touch the store). The resolution
/// attribute and the mapped profile attributes live in `attributes`.
#[derive(Debug, Clone)]
pub struct IdentityRecord {
    pub identity_id: Option<Uuid>,
    pub attributes: BTreeMap<String, String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,

    claims: Option<ClaimSet>,
    token: Option<String>,
}

impl IdentityRecord {
    pub fn new(attributes: BTreeMap<String, String>) -> Self {
        Self {
            identity_id: None,
            attributes,
            created_at: None,
            updated_at: None,
            claims: None,
            token: None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Claim set this record was resolved from, if any. Useful for
    /// inspecting provider metadata (e.g. anonymous sign-in detection).
    pub fn claims(&self) -> Option<&ClaimSet> {
        self.claims.as_ref()
    }

    pub fn with_claims(mut self, claims: ClaimSet) -> Self {
        self.claims = Some(claims);
        self
    }

    /// Raw bearer token used for this request. Transient request metadata,
    /// never persisted.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    // Token-based identities have no local credentials. These exist so that
    // callers wired for credential flows fail loudly instead of silently
    // authenticating nothing.

    pub fn auth_password(&self) -> Result<&str, UnsupportedOperation> {
        Err(UnsupportedOperation(
            "no password support for token identities",
        ))
    }

    pub fn remember_token(&self) -> Result<&str, UnsupportedOperation> {
        Err(UnsupportedOperation(
            "no remember-token support for token identities",
        ))
    }

    pub fn set_remember_token(&mut self, _value: &str) -> Result<(), UnsupportedOperation> {
        Err(UnsupportedOperation(
            "no remember-token support for token identities",
        ))
    }
}
