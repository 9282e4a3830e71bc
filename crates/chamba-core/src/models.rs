//! Domain models for the Chambalabamba site.
//!
//! Page content (galleries, blog posts, cooperations, ...) is not modeled
//! here: it only ever enters the store as fixture records. What remains are
//! the account-side entities that role synchronization operates on and the
//! seed ledger record.

pub mod account;
pub mod group;
pub mod profile;
pub mod seed;
pub mod user_type;
