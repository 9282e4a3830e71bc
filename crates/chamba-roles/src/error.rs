//! Role synchronization error types.

use chamba_core::error::ChambaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoleError {
    #[error("user type name must not be empty")]
    EmptyTypeName,

    #[error("user type '{0}' has no usable slug")]
    EmptySlug(String),

    #[error("invalid phone number: {0}")]
    InvalidPhone(String),

    #[error("the role group of a user type is managed automatically")]
    ManagedGroup,
}

impl From<RoleError> for ChambaError {
    fn from(err: RoleError) -> Self {
        ChambaError::Validation {
            message: err.to_string(),
        }
    }
}
