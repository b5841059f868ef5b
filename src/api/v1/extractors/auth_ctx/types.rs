/*
 * Responsibility
 * - Handler から見える「認証済みコンテキスト」の型
 * - middleware が解決して request extensions に格納し、handler はこの型だけを受け取る
 *
 * Notes
 * - token 検証やクレーム解決は middleware/services 側の責務
 * - ここは「型（契約）」として固定化し、認証の実装詳細から切り離す
 */

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::services::auth::IdentityRecord;

/// 認証済みのリクエストに付与されるコンテキスト
///
/// - `identifier` は解決キー属性の値（外部 IdP の subject 等）
/// - `identity_id` はストアの内部キー（stateless mode では None）
/// - `attributes` はマッピング済みのプロフィール属性
#[derive(Debug, Clone)]
pub struct AuthCtx {
    pub identifier: String,
    pub identity_id: Option<Uuid>,
    pub attributes: BTreeMap<String, String>,
}

impl AuthCtx {
    pub fn from_identity(identity: &IdentityRecord, resolve_attribute: &str) -> Self {
        Self {
            identifier: identity
                .attribute(resolve_attribute)
                .unwrap_or_default()
                .to_string(),
            identity_id: identity.identity_id,
            attributes: identity.attributes.clone(),
        }
    }
}
