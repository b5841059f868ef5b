/*
 * Responsibility
 * - 現在のアイデンティティの response DTO
 */
use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    /// Resolution identifier (the external subject by default).
    pub id: String,
    /// Store-internal key; absent in stateless deployments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_id: Option<Uuid>,
    pub attributes: BTreeMap<String, String>,
}
