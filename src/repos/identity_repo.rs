/*
 * Responsibility
 * - identities テーブル向け SQLx 操作 (IdentityStore の Postgres 実装)
 * - 属性は JSONB に集約し、解決属性の一意性は unique index に任せる
 * - unique violation (23505) は RepoError::Conflict に変換する
 */
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::repos::error::RepoError;
use crate::services::auth::identity::IdentityRecord;
use crate::services::auth::store::IdentityStore;

#[derive(Debug, FromRow)]
struct IdentityRow {
    identity_id: Uuid,
    attributes: Json<BTreeMap<String, String>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<IdentityRow> for IdentityRecord {
    fn from(row: IdentityRow) -> Self {
        let mut record = IdentityRecord::new(row.attributes.0);
        record.identity_id = Some(row.identity_id);
        record.created_at = Some(row.created_at);
        record.updated_at = Some(row.updated_at);
        record
    }
}

#[derive(Clone, Debug)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_one(
        &self,
        attribute: &str,
        value: &str,
    ) -> Result<Option<IdentityRecord>, RepoError> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r#"
            SELECT identity_id, attributes, created_at, updated_at
            FROM identities
            WHERE attributes->>$1 = $2
            "#,
        )
        .bind(attribute)
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)?;

        Ok(row.map(IdentityRecord::from))
    }

    async fn create(
        &self,
        attributes: &BTreeMap<String, String>,
    ) -> Result<IdentityRecord, RepoError> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r#"
            INSERT INTO identities (attributes)
            VALUES ($1)
            RETURNING identity_id, attributes, created_at, updated_at
            "#,
        )
        .bind(Json(attributes))
        .fetch_one(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)?;

        Ok(row.into())
    }

    async fn update(
        &self,
        record: &IdentityRecord,
        attributes: &BTreeMap<String, String>,
    ) -> Result<IdentityRecord, RepoError> {
        let identity_id = record.identity_id.ok_or(RepoError::Unsaved)?;

        // Shallow jsonb merge: only the supplied attributes are overwritten.
        let row = sqlx::query_as::<_, IdentityRow>(
            r#"
            UPDATE identities
            SET attributes = attributes || $2, updated_at = now()
            WHERE identity_id = $1
            RETURNING identity_id, attributes, created_at, updated_at
            "#,
        )
        .bind(identity_id)
        .bind(Json(attributes))
        .fetch_one(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)?;

        Ok(row.into())
    }
}
