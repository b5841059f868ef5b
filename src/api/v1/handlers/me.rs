/*
 * Responsibility
 * - GET /me: guard が解決したアイデンティティを返す
 * - 認証の実体は middleware 側。ここは AuthCtx を DTO に写すだけ
 */
use axum::Json;

use crate::api::v1::dto::me::MeResponse;
use crate::api::v1::extractors::AuthCtxExtractor;

pub async fn me(AuthCtxExtractor(ctx): AuthCtxExtractor) -> Json<MeResponse> {
    Json(MeResponse {
        id: ctx.identifier,
        identity_id: ctx.identity_id,
        attributes: ctx.attributes,
    })
}
