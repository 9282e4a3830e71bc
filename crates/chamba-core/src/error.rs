//! Error types shared by every Chambalabamba crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChambaError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Seed load failed for tag {tag}: {reason}")]
    Seed { tag: String, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ChambaResult<T> = Result<T, ChambaError>;
