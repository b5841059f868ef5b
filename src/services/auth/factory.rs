/// Factory: build the shared auth pieces from application `Config`.
use std::sync::Arc;

use sqlx::PgPool;

use crate::config::{Config, IdentityPersistence};
use crate::error::AppError;
use crate::repos::identity_repo::PgIdentityStore;
use crate::services::auth::guard::AuthSettings;
use crate::services::auth::id_token::IdTokenVerifier;
use crate::services::auth::resolver::IdentityResolver;
use crate::services::auth::store::IdentityStore;
use crate::services::auth::verifier::TokenVerifier;

pub fn build_verifier(config: &Config) -> Result<Arc<dyn TokenVerifier>, AppError> {
    let verifier = IdTokenVerifier::new(
        &config.id_token_public_key_pem,
        &config.project_id,
        config.id_token_leeway_seconds,
    )
    .map_err(|e| {
        tracing::error!(error = %e, "failed to build id-token verifier");
        AppError::Internal
    })?;

    Ok(Arc::new(verifier))
}

pub fn build_resolver(config: &Config, db: Option<PgPool>) -> Arc<IdentityResolver> {
    let resolver = match (config.persistence, db) {
        (IdentityPersistence::Store, Some(pool)) => {
            let store: Arc<dyn IdentityStore> = Arc::new(PgIdentityStore::new(pool));
            IdentityResolver::Store(store)
        }
        // Config validation guarantees a DATABASE_URL in store mode, so a
        // missing pool only happens in stateless deployments.
        _ => IdentityResolver::Stateless,
    };

    Arc::new(resolver)
}

pub fn build_settings(config: &Config) -> Arc<AuthSettings> {
    Arc::new(AuthSettings {
        mapping: config.claims_mapping.clone(),
        resolve_by: config.resolve_by.clone(),
        token_cookie: config.token_cookie_name.clone(),
        debug: config.auth_debug,
    })
}
