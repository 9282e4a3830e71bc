//! Role synchronization service.
//!
//! Every user type is backed by one permission group named
//! `role_prefix + slug`, and every account is a member of exactly the
//! group of its profile's current type. Other components report changes
//! through [`RoleSync::handle`].

use chamba_core::error::{ChambaError, ChambaResult};
use chamba_core::events::{DomainEvent, Module};
use chamba_core::models::account::{Account, CreateAccount};
use chamba_core::models::profile::{CreateProfile, UpdateProfile, UserProfile};
use chamba_core::models::user_type::{CreateUserType, UpdateUserType, UserType};
use chamba_core::repository::{
    AccountRepository, GroupRename, PermissionGroupRepository, ProfileRepository,
    UserTypeRepository,
};
use chamba_core::slug::slugify;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{RoleSyncConfig, TypeDefaults};
use crate::error::RoleError;
use crate::validation::validate_phone;

/// The two user types that exist on every installation.
#[derive(Debug, Clone)]
pub struct WellKnownTypes {
    pub externo: UserType,
    pub residente: UserType,
}

/// Role synchronization service.
///
/// Generic over repository implementations so that role logic has no
/// dependency on the database crate.
pub struct RoleSync<A, G, T, P>
where
    A: AccountRepository,
    G: PermissionGroupRepository,
    T: UserTypeRepository,
    P: ProfileRepository,
{
    accounts: A,
    groups: G,
    types: T,
    profiles: P,
    config: RoleSyncConfig,
}

impl<A, G, T, P> RoleSync<A, G, T, P>
where
    A: AccountRepository,
    G: PermissionGroupRepository,
    T: UserTypeRepository,
    P: ProfileRepository,
{
    pub fn new(accounts: A, groups: G, types: T, profiles: P, config: RoleSyncConfig) -> Self {
        Self {
            accounts,
            groups,
            types,
            profiles,
            config,
        }
    }

    pub fn config(&self) -> &RoleSyncConfig {
        &self.config
    }

    /// Route a domain event to its handler.
    pub async fn handle(&self, event: &DomainEvent) -> ChambaResult<()> {
        match event {
            DomainEvent::Migrated {
                module: Module::Authentication,
            } => {
                self.bootstrap().await?;
            }
            DomainEvent::Migrated { .. } => {}
            DomainEvent::AccountCreated { account } => {
                self.on_account_created(account).await?;
            }
            DomainEvent::UserTypeSaved { user_type, .. } => {
                self.ensure_group(user_type).await?;
            }
            DomainEvent::ProfileSaved { profile } => {
                self.sync_membership(profile).await?;
            }
        }
        Ok(())
    }

    /// Make sure both well-known types exist and are bound to their groups.
    pub async fn bootstrap(&self) -> ChambaResult<WellKnownTypes> {
        let externo = self.well_known(&self.config.default_type).await?;
        let residente = self.well_known(&self.config.resident_type).await?;

        info!(
            externo = %externo.slug,
            residente = %residente.slug,
            "Well-known user types ready"
        );

        Ok(WellKnownTypes { externo, residente })
    }

    /// The type given to new accounts, created on first reference.
    pub async fn default_user_type(&self) -> ChambaResult<UserType> {
        self.well_known(&self.config.default_type).await
    }

    async fn well_known(&self, defaults: &TypeDefaults) -> ChambaResult<UserType> {
        let (user_type, created) = self
            .types
            .get_or_create_by_slug(&defaults.slug, defaults.to_create())
            .await?;
        if created {
            info!(slug = %user_type.slug, "Created user type");
        }
        self.ensure_group(&user_type).await
    }

    pub async fn create_user_type(&self, input: CreateUserType) -> ChambaResult<UserType> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(RoleError::EmptyTypeName.into());
        }
        let slug = resolve_slug(&name, input.slug.as_deref())?;

        let created = self
            .types
            .create(CreateUserType {
                name,
                slug: Some(slug),
                description: input.description,
            })
            .await?;

        self.ensure_group(&created).await
    }

    /// Update a user type's name, slug or description. The group binding
    /// is not caller-editable; a slug change renames the bound group.
    pub async fn update_user_type(&self, id: Uuid, input: UpdateUserType) -> ChambaResult<UserType> {
        if input.group_id.is_some() {
            return Err(RoleError::ManagedGroup.into());
        }
        let current = self.types.get_by_id(id).await?;

        let name = match input.name {
            Some(name) => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(RoleError::EmptyTypeName.into());
                }
                Some(name)
            }
            None => None,
        };

        let slug = match input.slug.as_deref() {
            Some(slug) => {
                let effective_name = name.as_deref().unwrap_or(&current.name);
                Some(resolve_slug(effective_name, Some(slug))?)
            }
            None => None,
        };
        let final_slug = slug.as_deref().unwrap_or(&current.slug);

        // The bound group is renamed to match the slug in the same
        // transaction as the type update; its id and members stay.
        let mut group_id = None;
        let mut rename = None;
        if let Some(bound_id) = current.group_id {
            match self.groups.get_by_id(bound_id).await {
                Ok(group) => {
                    let wanted = self.config.group_name(final_slug);
                    if group.name != wanted {
                        rename = Some(GroupRename {
                            group_id: bound_id,
                            name: wanted,
                        });
                    }
                }
                // The binding points at a deleted group; drop it so a fresh
                // group is bound below.
                Err(ChambaError::NotFound { .. }) => {
                    warn!(slug = %current.slug, "Bound role group is gone, rebinding");
                    group_id = Some(None);
                }
                Err(e) => return Err(e),
            }
        }

        let renamed = rename.as_ref().map(|r| r.name.clone());
        let updated = self
            .types
            .update_with_group_rename(
                id,
                UpdateUserType {
                    name,
                    slug,
                    description: input.description,
                    group_id,
                },
                rename,
            )
            .await?;

        if let Some(group) = renamed {
            info!(
                from = %current.slug,
                to = %updated.slug,
                group = %group,
                "Renamed role group"
            );
        }

        self.ensure_group(&updated).await
    }

    /// Bind `user_type` to its role group if it has none yet.
    pub async fn ensure_group(&self, user_type: &UserType) -> ChambaResult<UserType> {
        if user_type.group_id.is_some() {
            return Ok(user_type.clone());
        }

        let name = self.config.group_name(&user_type.slug);
        let group = self.groups.get_or_create_by_name(&name).await?;
        let bound = self
            .types
            .update(
                user_type.id,
                UpdateUserType {
                    group_id: Some(Some(group.id)),
                    ..Default::default()
                },
            )
            .await?;

        info!(slug = %bound.slug, group = %group.name, "Bound user type to role group");
        Ok(bound)
    }

    /// Create an account and give it a profile with the default type.
    pub async fn register_account(&self, input: CreateAccount) -> ChambaResult<Account> {
        let account = self.accounts.create(input).await?;
        self.on_account_created(&account).await?;
        Ok(account)
    }

    async fn on_account_created(&self, account: &Account) -> ChambaResult<UserProfile> {
        let default_type = self.default_user_type().await?;
        let (profile, created) = self
            .profiles
            .get_or_create(CreateProfile {
                account_id: account.id,
                user_type_id: default_type.id,
                display_name: account.display_name.clone(),
            })
            .await?;

        if created {
            info!(username = %account.username, "Created profile for new account");
            self.sync_membership(&profile).await?;
        }
        Ok(profile)
    }

    /// Validate and persist profile changes, then resync role membership.
    pub async fn save_profile(
        &self,
        account_id: Uuid,
        input: UpdateProfile,
    ) -> ChambaResult<UserProfile> {
        if let Some(phone) = input.phone.as_deref() {
            validate_phone(phone)?;
        }
        if let Some(user_type_id) = input.user_type_id {
            self.types.get_by_id(user_type_id).await?;
        }

        let profile = self.profiles.update(account_id, input).await?;
        self.sync_membership(&profile).await?;
        Ok(profile)
    }

    /// Replace the account's role-prefixed memberships with the group of
    /// the profile's current type.
    pub async fn sync_membership(&self, profile: &UserProfile) -> ChambaResult<()> {
        let user_type = self.checked_binding(profile.user_type_id).await?;

        if user_type.group_id.is_none() {
            debug!(
                account_id = %profile.account_id,
                slug = %user_type.slug,
                "User type has no bound group; clearing role membership only"
            );
        }

        self.groups
            .replace_prefixed_membership(
                profile.account_id,
                &self.config.role_prefix,
                user_type.group_id,
            )
            .await?;

        debug!(
            account_id = %profile.account_id,
            slug = %user_type.slug,
            "Synchronized role membership"
        );
        Ok(())
    }

    /// Load a user type, rebinding it when its group has been deleted.
    async fn checked_binding(&self, id: Uuid) -> ChambaResult<UserType> {
        let user_type = self.types.get_by_id(id).await?;
        let Some(group_id) = user_type.group_id else {
            return Ok(user_type);
        };

        match self.groups.get_by_id(group_id).await {
            Ok(_) => Ok(user_type),
            Err(ChambaError::NotFound { .. }) => {
                warn!(slug = %user_type.slug, "Bound role group is gone, rebinding");
                let cleared = self
                    .types
                    .update(
                        id,
                        UpdateUserType {
                            group_id: Some(None),
                            ..Default::default()
                        },
                    )
                    .await?;
                self.ensure_group(&cleared).await
            }
            Err(e) => Err(e),
        }
    }

    pub async fn profile_user_type(&self, account_id: Uuid) -> ChambaResult<UserType> {
        let profile = self.profiles.get_by_account(account_id).await?;
        self.types.get_by_id(profile.user_type_id).await
    }
}

/// Use `slug` when given and non-blank, otherwise derive one from `name`.
fn resolve_slug(name: &str, slug: Option<&str>) -> Result<String, RoleError> {
    let slug = match slug.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => slugify(name),
    };
    if slug.is_empty() {
        return Err(RoleError::EmptySlug(name.to_string()));
    }
    Ok(slug)
}
