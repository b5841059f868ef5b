//! 認証 guard middleware: bearer token 検証 → AuthCtx を extensions に入れる
//!
//! - Guard は request 単位に生成され、Verifier/Resolver を一度だけ呼ぶ。
//! - Anonymous (token なし / expired / downgrade) はここで 401 にする。
//! - debug mode のときだけ元のエラーが response に現れる。

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::api::v1::extractors::AuthCtx;
use crate::error::AppError;
use crate::middleware::token_cookie::bearer_token;
use crate::services::auth::AuthGuard;
use crate::state::AppState;

/// `/api/v1/*` に認証を掛けるための middleware を適用する。
///
/// 例：
/// ```ignore
/// let v1 = api::v1::routes();
/// let v1 = middleware::auth::access::apply(v1, state.clone());
/// let v1 = middleware::token_cookie::apply(v1, state.clone());
/// app = app.nest("/api/v1", v1);
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8 の from_fn は State extractor を受け取れないため、`from_fn_with_state` で明示的に state を渡す
    router.layer(middleware::from_fn_with_state(state, access_middleware))
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers()).map(str::to_owned);

    let mut guard = AuthGuard::new(
        state.verifier.clone(),
        state.resolver.clone(),
        state.auth.clone(),
    );

    match guard.authenticate(token.as_deref()).await {
        Ok(Some(identity)) => {
            let auth_ctx = AuthCtx::from_identity(identity, state.auth.resolve_by.attribute());

            // middleware → extractor への受け渡し
            req.extensions_mut().insert(auth_ctx);

            Ok(next.run(req).await)
        }
        Ok(None) => Err(AppError::Unauthorized),
        // Only reachable with AUTH_DEBUG on; surface the original failure.
        Err(err) => Err(AppError::auth_diagnostic(err.to_string())),
    }
}
