//! User profile domain model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-account profile. Exactly one exists for every account; it carries
/// the account's current user type, from which role group membership is
/// derived.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: Uuid,
    pub account_id: Uuid,
    pub user_type_id: Uuid,
    pub display_name: String,
    pub phone: String,
    pub bio: String,
    pub community_role: String,
    pub contribution_areas: String,
    pub availability: String,
    pub resident_since: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProfile {
    pub account_id: Uuid,
    pub user_type_id: Uuid,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateProfile {
    pub user_type_id: Option<Uuid>,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub community_role: Option<String>,
    pub contribution_areas: Option<String>,
    pub availability: Option<String>,
    /// `Some(Some(d))` = set, `Some(None)` = clear, `None` = no change.
    pub resident_since: Option<Option<NaiveDate>>,
}
