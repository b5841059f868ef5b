/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::services::auth::AuthSettings;
use crate::services::auth::resolver::IdentityResolver;
use crate::services::auth::verifier::TokenVerifier;

#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<dyn TokenVerifier>,
    pub resolver: Arc<IdentityResolver>,
    pub auth: Arc<AuthSettings>,
}

impl AppState {
    pub fn new(
        verifier: Arc<dyn TokenVerifier>,
        resolver: Arc<IdentityResolver>,
        auth: Arc<AuthSettings>,
    ) -> Self {
        Self {
            verifier,
            resolver,
            auth,
        }
    }
}
