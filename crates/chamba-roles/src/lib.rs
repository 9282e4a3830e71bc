//! Chamba Roles: keeps user types bound to permission groups and each
//! account's role membership in step with its profile.

pub mod config;
pub mod error;
pub mod service;
pub mod validation;

pub use config::{RoleSyncConfig, TypeDefaults};
pub use error::RoleError;
pub use service::{RoleSync, WellKnownTypes};
