//! Chambalabamba Core: domain models, repository traits, typed domain
//! events and naming helpers shared across the workspace.

pub mod error;
pub mod events;
pub mod models;
pub mod repository;
pub mod slug;
