//! Schema definitions and migration runner for SurrealDB.
//!
//! Account-side tables are SCHEMAFULL. Tables that receive fixture
//! records (`<app_label>_<model>`) are not declared here: they are
//! created on first write by the seed ledger and stay schemaless.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, info};

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "accounts_and_groups",
        sql: SCHEMA_V1,
    },
    Migration {
        version: 2,
        name: "user_types_and_profiles",
        sql: SCHEMA_V2,
    },
];

// -----------------------------------------------------------------------
// Schema v1: account store and permission groups
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
DEFINE TABLE account SCHEMAFULL;
DEFINE FIELD username ON TABLE account TYPE string;
DEFINE FIELD email ON TABLE account TYPE string;
DEFINE FIELD display_name ON TABLE account TYPE string DEFAULT '';
DEFINE FIELD password_hash ON TABLE account TYPE string;
DEFINE FIELD created_at ON TABLE account TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE account TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_account_username ON TABLE account \
    COLUMNS username UNIQUE;
DEFINE INDEX idx_account_email ON TABLE account \
    COLUMNS email UNIQUE;

DEFINE TABLE perm_group SCHEMAFULL;
DEFINE FIELD name ON TABLE perm_group TYPE string;
DEFINE FIELD created_at ON TABLE perm_group TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE perm_group TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_perm_group_name ON TABLE perm_group \
    COLUMNS name UNIQUE;

-- Account -> PermissionGroup membership
DEFINE TABLE member_of TYPE RELATION SCHEMAFULL;
";

// -----------------------------------------------------------------------
// Schema v2: user types (roles) and profiles
// -----------------------------------------------------------------------

const SCHEMA_V2: &str = "\
DEFINE TABLE user_type SCHEMAFULL;
DEFINE FIELD name ON TABLE user_type TYPE string;
DEFINE FIELD slug ON TABLE user_type TYPE string;
DEFINE FIELD description ON TABLE user_type TYPE string DEFAULT '';
DEFINE FIELD group_id ON TABLE user_type TYPE option<string>;
DEFINE INDEX idx_user_type_name ON TABLE user_type \
    COLUMNS name UNIQUE;
DEFINE INDEX idx_user_type_slug ON TABLE user_type \
    COLUMNS slug UNIQUE;

DEFINE TABLE user_profile SCHEMAFULL;
DEFINE FIELD account_id ON TABLE user_profile TYPE string;
DEFINE FIELD user_type_id ON TABLE user_profile TYPE string;
DEFINE FIELD display_name ON TABLE user_profile TYPE string DEFAULT '';
DEFINE FIELD phone ON TABLE user_profile TYPE string DEFAULT '';
DEFINE FIELD bio ON TABLE user_profile TYPE string DEFAULT '';
DEFINE FIELD community_role ON TABLE user_profile TYPE string DEFAULT '';
DEFINE FIELD contribution_areas ON TABLE user_profile TYPE string \
    DEFAULT '';
DEFINE FIELD availability ON TABLE user_profile TYPE string DEFAULT '';
DEFINE FIELD resident_since ON TABLE user_profile TYPE option<string>;
DEFINE FIELD created_at ON TABLE user_profile TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user_profile TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_profile_account ON TABLE user_profile \
    COLUMNS account_id UNIQUE;
DEFINE INDEX idx_user_profile_type ON TABLE user_profile \
    COLUMNS user_type_id;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    let pending = MIGRATIONS
        .iter()
        .filter(|m| m.version > current_version)
        .collect::<Vec<_>>();
    if pending.is_empty() {
        debug!(version = current_version, "Schema is up to date");
        return Ok(());
    }

    for migration in pending {
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "Migration v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query(
            "CREATE type::record('_migration', $version) SET \
             version = $version, name = $name",
        )
        .bind(("version", migration.version))
        .bind(("name", migration.name))
        .await?
        .check()
        .map_err(|e| {
            DbError::Migration(format!(
                "Failed to record migration v{}: {}",
                migration.version, e,
            ))
        })?;
    }

    info!(
        version = MIGRATIONS.last().map(|m| m.version).unwrap_or(0),
        "Schema migrated"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_migration_has_ddl() {
        assert!(MIGRATIONS.iter().all(|m| !m.sql.trim().is_empty()));
    }

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }
}
