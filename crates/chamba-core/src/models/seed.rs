//! Seed ledger record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One applied seeding batch. Presence of the tag means the batch has
/// already been loaded into this database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeedRecord {
    pub tag: String,
    pub applied_at: DateTime<Utc>,
}
