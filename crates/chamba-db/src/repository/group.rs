//! SurrealDB implementation of [`PermissionGroupRepository`].
//!
//! Membership is stored as `account -> member_of -> perm_group` edges.

use chamba_core::error::{ChambaError, ChambaResult};
use chamba_core::models::group::PermissionGroup;
use chamba_core::repository::PermissionGroupRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::{CountRow, parse_uuid, write_error};
use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct GroupRow {
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct GroupRowWithId {
    record_id: String,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GroupRow {
    fn into_group(self, id: Uuid) -> PermissionGroup {
        PermissionGroup {
            id,
            name: self.name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl GroupRowWithId {
    fn try_into_group(self) -> Result<PermissionGroup, DbError> {
        Ok(PermissionGroup {
            id: parse_uuid(&self.record_id)?,
            name: self.name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the permission-group store.
#[derive(Clone)]
pub struct SurrealPermissionGroupRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPermissionGroupRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<PermissionGroup>, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM perm_group \
                 WHERE name = $name",
            )
            .bind(("name", name.to_string()))
            .await?;

        let rows: Vec<GroupRowWithId> = result.take(0)?;
        rows.into_iter().next().map(|row| row.try_into_group()).transpose()
    }

    async fn ensure_group_exists(&self, group_id: Uuid) -> ChambaResult<()> {
        let mut check = self
            .db
            .query(
                "SELECT count() AS total FROM perm_group \
                 WHERE id = type::record('perm_group', $group_id) GROUP ALL",
            )
            .bind(("group_id", group_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = check.take(0).map_err(DbError::from)?;
        if rows.first().map(|r| r.total).unwrap_or(0) == 0 {
            return Err(DbError::NotFound {
                entity: "perm_group".into(),
                id: group_id.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl<C: Connection> PermissionGroupRepository for SurrealPermissionGroupRepository<C> {
    async fn get_or_create_by_name(&self, name: &str) -> ChambaResult<PermissionGroup> {
        if let Some(group) = self.find_by_name(name).await? {
            return Ok(group);
        }

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query("CREATE type::record('perm_group', $id) SET name = $name")
            .bind(("id", id_str.clone()))
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        match result.check() {
            Ok(mut result) => {
                let rows: Vec<GroupRow> = result.take(0).map_err(DbError::from)?;
                let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
                    entity: "perm_group".into(),
                    id: id_str,
                })?;
                debug!(group = name, "Created permission group");
                Ok(row.into_group(id))
            }
            // Lost a race on the unique name; the other writer's row wins.
            Err(e) => self
                .find_by_name(name)
                .await?
                .ok_or_else(|| ChambaError::Database(e.to_string())),
        }
    }

    async fn get_by_id(&self, id: Uuid) -> ChambaResult<PermissionGroup> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('perm_group', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "perm_group".into(),
            id: id_str,
        })?;

        Ok(row.into_group(id))
    }

    async fn rename(&self, id: Uuid, new_name: &str) -> ChambaResult<PermissionGroup> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "UPDATE type::record('perm_group', $id) SET \
                 name = $name, updated_at = time::now()",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", new_name.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| write_error(&format!("perm_group {new_name}"), [e]))?;

        let rows: Vec<GroupRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "perm_group".into(),
            id: id_str,
        })?;

        Ok(row.into_group(id))
    }

    async fn add_member(&self, group_id: Uuid, account_id: Uuid) -> ChambaResult<()> {
        self.ensure_group_exists(group_id).await?;

        self.db
            .query(
                "BEGIN TRANSACTION; \
                 LET $account = type::record('account', $account_id); \
                 LET $group = type::record('perm_group', $group_id); \
                 DELETE member_of WHERE in = $account AND out = $group; \
                 RELATE $account->member_of->$group; \
                 COMMIT TRANSACTION;",
            )
            .bind(("account_id", account_id.to_string()))
            .bind(("group_id", group_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| write_error("member_of", [e]))?;

        Ok(())
    }

    async fn remove_member(&self, group_id: Uuid, account_id: Uuid) -> ChambaResult<()> {
        self.db
            .query(
                "DELETE member_of WHERE \
                 in = type::record('account', $account_id) AND \
                 out = type::record('perm_group', $group_id)",
            )
            .bind(("account_id", account_id.to_string()))
            .bind(("group_id", group_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| write_error("member_of", [e]))?;

        Ok(())
    }

    async fn list_by_name_prefix(&self, prefix: &str) -> ChambaResult<Vec<PermissionGroup>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM perm_group \
                 WHERE string::starts_with(name, $prefix) \
                 ORDER BY name ASC",
            )
            .bind(("prefix", prefix.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupRowWithId> = result.take(0).map_err(DbError::from)?;

        let groups = rows
            .into_iter()
            .map(|row| row.try_into_group())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(groups)
    }

    async fn get_account_groups(&self, account_id: Uuid) -> ChambaResult<Vec<PermissionGroup>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM perm_group \
                 WHERE id IN (\
                     SELECT VALUE out FROM member_of \
                     WHERE in = type::record('account', $account_id)\
                 ) \
                 ORDER BY name ASC",
            )
            .bind(("account_id", account_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupRowWithId> = result.take(0).map_err(DbError::from)?;

        let groups = rows
            .into_iter()
            .map(|row| row.try_into_group())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(groups)
    }

    async fn replace_prefixed_membership(
        &self,
        account_id: Uuid,
        prefix: &str,
        group_id: Option<Uuid>,
    ) -> ChambaResult<()> {
        // A bound group that no longer exists gets no edge.
        let add = if group_id.is_some() {
            "LET $group = type::record('perm_group', $group_id); \
             IF record::exists($group) { \
                 DELETE member_of WHERE in = $account AND out = $group; \
                 RELATE $account->member_of->$group; \
             };"
        } else {
            ""
        };

        let query = format!(
            "BEGIN TRANSACTION; \
             LET $account = type::record('account', $account_id); \
             LET $stale = (SELECT VALUE id FROM perm_group \
                 WHERE string::starts_with(name, $prefix)); \
             DELETE member_of WHERE in = $account AND out IN $stale; \
             {add} \
             COMMIT TRANSACTION;"
        );

        let mut builder = self
            .db
            .query(query)
            .bind(("account_id", account_id.to_string()))
            .bind(("prefix", prefix.to_string()));
        if let Some(group_id) = group_id {
            builder = builder.bind(("group_id", group_id.to_string()));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| write_error("member_of", [e]))?;

        Ok(())
    }
}
