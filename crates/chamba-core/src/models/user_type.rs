//! User type (role) domain model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Slug of the type every new account starts with.
pub const EXTERNAL_SLUG: &str = "externo";

/// Slug of the type given to people living in the community.
pub const RESIDENT_SLUG: &str = "residente";

/// An administrator-defined category of user, bound 1:1 to a permission
/// group named after its slug.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserType {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    /// Backing permission group. `None` until the type is first bound.
    pub group_id: Option<Uuid>,
}

impl UserType {
    pub fn is_external(&self) -> bool {
        self.slug == EXTERNAL_SLUG
    }

    pub fn is_resident(&self) -> bool {
        self.slug == RESIDENT_SLUG
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserType {
    pub name: String,
    /// Derived from `name` when absent or blank.
    pub slug: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUserType {
    pub name: Option<String>,
    /// `Some(String::new())` clears the slug so it is re-derived from the name.
    pub slug: Option<String>,
    pub description: Option<String>,
    /// `Some(Some(id))` = bind, `Some(None)` = unbind, `None` = no change.
    pub group_id: Option<Option<Uuid>>,
}
