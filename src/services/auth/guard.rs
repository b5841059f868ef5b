/*
 * Responsibility
 * - リクエスト単位の認証オーケストレーション (state machine)
 *   Unresolved → Resolving → { Resolved(identity), Anonymous }
 * - token 抽出 → Verifier → Resolver の順に一度だけ呼ぶ (memoized)
 * - エラー分類: Expired は常に Anonymous、その他は debug 設定で propagate
 */
use std::sync::Arc;

use thiserror::Error;

use crate::services::auth::identity::IdentityRecord;
use crate::services::auth::mapper::ClaimsMapping;
use crate::services::auth::resolver::{IdentityResolver, ResolveBy, ResolveError};
use crate::services::auth::verifier::{TokenVerifier, VerifyError};

/// Deployment-level authentication policy, built once from `Config` and
/// shared by the guard and the transport middleware.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub mapping: ClaimsMapping,
    pub resolve_by: ResolveBy,
    /// Cookie promoted to the Authorization header when the header is absent.
    pub token_cookie: String,
    /// When set, verification/resolution failures surface to the caller
    /// instead of being downgraded to an anonymous result.
    pub debug: bool,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            mapping: ClaimsMapping::default(),
            resolve_by: ResolveBy::default(),
            token_cookie: "bearer_token".to_string(),
            debug: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Verify(#[from] VerifyError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Guard state. `Resolved` and `Anonymous` are terminal for the request;
/// once reached, `authenticate` returns the cached result without touching
/// the verifier or the store again.
#[derive(Debug)]
enum AuthState {
    Unresolved,
    Resolving,
    Resolved(IdentityRecord),
    Anonymous,
}

/// Per-request authentication orchestrator.
///
/// One guard lives for the lifetime of a single request and holds no shared
/// mutable state besides its own cache; concurrent requests resolve fully
/// independently. The verifier and store it delegates to are shared and
/// externally synchronized.
pub struct AuthGuard {
    verifier: Arc<dyn TokenVerifier>,
    resolver: Arc<IdentityResolver>,
    settings: Arc<AuthSettings>,
    state: AuthState,
}

impl AuthGuard {
    pub fn new(
        verifier: Arc<dyn TokenVerifier>,
        resolver: Arc<IdentityResolver>,
        settings: Arc<AuthSettings>,
    ) -> Self {
        Self {
            verifier,
            resolver,
            settings,
            state: AuthState::Unresolved,
        }
    }

    /// Authenticate the request's bearer token.
    ///
    /// Memoized: the verifier and resolver run at most once per guard, no
    /// matter how many times authentication state is queried. An `Err` is
    /// only possible with `debug` enabled; otherwise every failure except
    /// a missing token is logged and downgraded to `None`.
    pub async fn authenticate(
        &mut self,
        bearer: Option<&str>,
    ) -> Result<Option<&IdentityRecord>, AuthError> {
        if matches!(self.state, AuthState::Resolved(_) | AuthState::Anonymous) {
            return Ok(self.identity());
        }
        self.state = AuthState::Resolving;

        let token = match bearer.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => token,
            None => {
                self.state = AuthState::Anonymous;
                return Ok(None);
            }
        };

        let claims = match self.verifier.verify(token).await {
            Ok(claims) => claims,
            Err(VerifyError::Expired) => {
                // Expected churn; clients refresh and retry.
                tracing::debug!("expired identity token");
                self.state = AuthState::Anonymous;
                return Ok(None);
            }
            Err(err) => return self.fail(err.into()),
        };

        match self
            .resolver
            .resolve(&claims, &self.settings.resolve_by, &self.settings.mapping)
            .await
        {
            Ok(mut record) => {
                record.set_token(token);
                self.state = AuthState::Resolved(record);
                Ok(self.identity())
            }
            Err(err) => self.fail(err.into()),
        }
    }

    // Debug mode propagates (nothing is cached, the request is failing
    // anyway); otherwise log and settle on Anonymous.
    fn fail(&mut self, err: AuthError) -> Result<Option<&IdentityRecord>, AuthError> {
        if self.settings.debug {
            self.state = AuthState::Unresolved;
            return Err(err);
        }
        tracing::warn!(error = ?err, "authentication failed, treating as anonymous");
        self.state = AuthState::Anonymous;
        Ok(None)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, AuthState::Resolved(_))
    }

    pub fn identity(&self) -> Option<&IdentityRecord> {
        match &self.state {
            AuthState::Resolved(record) => Some(record),
            _ => None,
        }
    }

    /// Value of the resolution attribute for the resolved identity.
    pub fn identifier(&self) -> Option<&str> {
        self.identity()
            .and_then(|record| record.attribute(self.settings.resolve_by.attribute()))
    }
}
