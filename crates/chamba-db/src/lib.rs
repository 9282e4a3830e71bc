//! Chambalabamba Database: SurrealDB connection management, schema
//! migrations, the seed ledger and repository implementations.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - The idempotent seed ledger ([`SeedLedger`]) and fixture loading
//!   ([`FixtureLoader`])
//! - Error types ([`DbError`])

mod connection;
mod error;
pub mod fixture;
pub mod ledger;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use fixture::{FixtureLoader, FixtureRecord, FixtureResolver, FixtureSource, LoadError};
pub use ledger::{SeedLedger, SeedLoader, SeedOutcome};
pub use schema::run_migrations;
