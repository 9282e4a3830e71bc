//! Database-specific error types and conversions.

use chamba_core::error::ChambaError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Seed {tag} failed to load: {reason}")]
    LoadFailure { tag: String, reason: String },

    #[error("Seed ledger error: {0}")]
    Ledger(String),

    #[error("Stored value is invalid: {0}")]
    InvalidData(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

impl From<DbError> for ChambaError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ChambaError::NotFound { entity, id },
            DbError::LoadFailure { tag, reason } => ChambaError::Seed { tag, reason },
            DbError::PasswordHash(msg) => ChambaError::Internal(msg),
            other => ChambaError::Database(other.to_string()),
        }
    }
}
