/*
 * Responsibility
 * - トークン検証の seam (TokenVerifier trait)
 * - 検証エラーの分類: Expired は benign、それ以外は guard がポリシーで処理
 */
use async_trait::async_trait;
use thiserror::Error;

use crate::services::auth::claims::ClaimSet;

#[derive(Debug, Error)]
pub enum VerifyError {
    /// Token was valid once but is past its expiry. Benign; the guard
    /// always downgrades this to an anonymous result.
    #[error("token expired")]
    Expired,

    /// Token is malformed or fails signature/issuer/audience checks.
    #[error("invalid token: {0}")]
    Invalid(String),

    /// Verification could not be carried out (key material, transport).
    #[error("verification failed: {0}")]
    Verification(String),
}

/// Validates a bearer token string and returns the decoded claim set.
///
/// Implementations own signature, expiry and issuer checks; callers only
/// see a validated `ClaimSet` or a classified `VerifyError`. Shared across
/// requests, so implementations must be internally synchronized.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<ClaimSet, VerifyError>;
}
