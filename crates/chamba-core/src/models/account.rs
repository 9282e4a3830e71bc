//! Account domain model.
//!
//! Accounts belong to the login subsystem. Role synchronization only reads
//! them and reacts to their creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccount {
    pub username: String,
    pub email: String,
    pub display_name: String,
    /// Raw password (will be hashed with Argon2id before storage).
    pub password: String,
}
