//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. The account and permission-group
//! stores are collaborators of role synchronization: it consumes them
//! through these traits and never touches their tables directly.

use uuid::Uuid;

use crate::error::ChambaResult;
use crate::models::{
    account::{Account, CreateAccount},
    group::PermissionGroup,
    profile::{CreateProfile, UpdateProfile, UserProfile},
    user_type::{CreateUserType, UpdateUserType, UserType},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Account subsystem (external collaborators)
// ---------------------------------------------------------------------------

pub trait AccountRepository: Send + Sync {
    fn create(&self, input: CreateAccount) -> impl Future<Output = ChambaResult<Account>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = ChambaResult<Account>> + Send;
    fn get_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = ChambaResult<Account>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = ChambaResult<PaginatedResult<Account>>> + Send;
}

pub trait PermissionGroupRepository: Send + Sync {
    /// Fetch the group with this exact name, creating it if absent.
    fn get_or_create_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = ChambaResult<PermissionGroup>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = ChambaResult<PermissionGroup>> + Send;
    /// Rename a group in place. The group id and its memberships are kept.
    fn rename(
        &self,
        id: Uuid,
        new_name: &str,
    ) -> impl Future<Output = ChambaResult<PermissionGroup>> + Send;
    /// Idempotent: adding an existing member is a no-op.
    fn add_member(
        &self,
        group_id: Uuid,
        account_id: Uuid,
    ) -> impl Future<Output = ChambaResult<()>> + Send;
    fn remove_member(
        &self,
        group_id: Uuid,
        account_id: Uuid,
    ) -> impl Future<Output = ChambaResult<()>> + Send;
    fn list_by_name_prefix(
        &self,
        prefix: &str,
    ) -> impl Future<Output = ChambaResult<Vec<PermissionGroup>>> + Send;
    fn get_account_groups(
        &self,
        account_id: Uuid,
    ) -> impl Future<Output = ChambaResult<Vec<PermissionGroup>>> + Send;
    /// In one transaction, drop every membership of `account_id` in a group
    /// whose name starts with `prefix`, then add it to `group_id` if given.
    /// The add replaces an existing edge and is skipped when the group does
    /// not exist.
    fn replace_prefixed_membership(
        &self,
        account_id: Uuid,
        prefix: &str,
        group_id: Option<Uuid>,
    ) -> impl Future<Output = ChambaResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Role entities
// ---------------------------------------------------------------------------

/// A permission-group rename that must land together with a user-type
/// update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRename {
    pub group_id: Uuid,
    pub name: String,
}

pub trait UserTypeRepository: Send + Sync {
    /// Persist a new type. `input.slug` must already be resolved.
    fn create(&self, input: CreateUserType)
    -> impl Future<Output = ChambaResult<UserType>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = ChambaResult<UserType>> + Send;
    fn get_by_slug(&self, slug: &str) -> impl Future<Output = ChambaResult<UserType>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateUserType,
    ) -> impl Future<Output = ChambaResult<UserType>> + Send;
    /// Apply `input` and, when given, rename a permission group in the same
    /// transaction. Either both writes land or neither does.
    fn update_with_group_rename(
        &self,
        id: Uuid,
        input: UpdateUserType,
        rename: Option<GroupRename>,
    ) -> impl Future<Output = ChambaResult<UserType>> + Send;
    fn list(&self) -> impl Future<Output = ChambaResult<Vec<UserType>>> + Send;
    /// Returns the existing type with `slug`, or creates it from
    /// `defaults`. The flag is `true` when a row was created.
    fn get_or_create_by_slug(
        &self,
        slug: &str,
        defaults: CreateUserType,
    ) -> impl Future<Output = ChambaResult<(UserType, bool)>> + Send;
}

pub trait ProfileRepository: Send + Sync {
    fn create(
        &self,
        input: CreateProfile,
    ) -> impl Future<Output = ChambaResult<UserProfile>> + Send;
    fn get_by_account(
        &self,
        account_id: Uuid,
    ) -> impl Future<Output = ChambaResult<UserProfile>> + Send;
    /// Returns the account's profile, creating it from `input` if absent.
    /// The flag is `true` when a row was created.
    fn get_or_create(
        &self,
        input: CreateProfile,
    ) -> impl Future<Output = ChambaResult<(UserProfile, bool)>> + Send;
    fn update(
        &self,
        account_id: Uuid,
        input: UpdateProfile,
    ) -> impl Future<Output = ChambaResult<UserProfile>> + Send;
}
