//! Role synchronization configuration.

use chamba_core::models::user_type::{CreateUserType, EXTERNAL_SLUG, RESIDENT_SLUG};
use chamba_core::slug::ROLE_PREFIX;

/// Slug, name and description of a user type that must always exist.
#[derive(Debug, Clone)]
pub struct TypeDefaults {
    pub slug: String,
    pub name: String,
    pub description: String,
}

impl TypeDefaults {
    pub(crate) fn to_create(&self) -> CreateUserType {
        CreateUserType {
            name: self.name.clone(),
            slug: Some(self.slug.clone()),
            description: self.description.clone(),
        }
    }
}

/// Configuration for [`RoleSync`](crate::RoleSync).
#[derive(Debug, Clone)]
pub struct RoleSyncConfig {
    /// Every group whose name starts with this prefix is owned by role
    /// synchronization, including groups no user type refers to.
    pub role_prefix: String,
    /// Type given to every new account.
    pub default_type: TypeDefaults,
    pub resident_type: TypeDefaults,
}

impl Default for RoleSyncConfig {
    fn default() -> Self {
        Self {
            role_prefix: ROLE_PREFIX.into(),
            default_type: TypeDefaults {
                slug: EXTERNAL_SLUG.into(),
                name: "Externo".into(),
                description: "Usuario externo por defecto".into(),
            },
            resident_type: TypeDefaults {
                slug: RESIDENT_SLUG.into(),
                name: "Residente".into(),
                description: "Usuario residente".into(),
            },
        }
    }
}

impl RoleSyncConfig {
    /// Name of the permission group backing the user type with `slug`.
    ///
    /// A blank slug falls back to the default type's group.
    pub fn group_name(&self, slug: &str) -> String {
        let slug = match slug.trim() {
            "" => self.default_type.slug.as_str(),
            s => s,
        };
        format!("{}{slug}", self.role_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_name_uses_prefix() {
        let config = RoleSyncConfig::default();
        assert_eq!(config.group_name("residente"), "role:residente");
    }

    #[test]
    fn blank_slug_falls_back_to_default_type() {
        let config = RoleSyncConfig::default();
        assert_eq!(config.group_name("  "), "role:externo");
    }

    #[test]
    fn custom_prefix() {
        let config = RoleSyncConfig {
            role_prefix: "rol/".into(),
            ..Default::default()
        };
        assert_eq!(config.group_name("miembro"), "rol/miembro");
    }
}
