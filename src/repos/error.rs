/**
 * Responsibility
 * - repo が上位に伝える意味の定義
 */
use thiserror::Error;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("db error")]
    Db(#[from] sqlx::Error),

    /// Unique-key violation on the resolution attribute. The resolver
    /// treats this as retryable (re-query once); everything else propagates.
    #[error("conflict")]
    Conflict,

    /// Update requested for a record that was never persisted.
    #[error("record has no storage id")]
    Unsaved,
}

impl RepoError {
    pub fn from_sqlx(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(dbe) = &e
            && dbe.code().as_deref() == Some("23505")
        {
            return RepoError::Conflict;
        }
        RepoError::Db(e)
    }
}
