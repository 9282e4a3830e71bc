//! SurrealDB implementation of [`UserTypeRepository`].

use chamba_core::error::{ChambaError, ChambaResult};
use chamba_core::models::user_type::{CreateUserType, UpdateUserType, UserType};
use chamba_core::repository::{GroupRename, UserTypeRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{parse_optional_uuid, parse_uuid, write_error};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct UserTypeRow {
    name: String,
    slug: String,
    description: String,
    group_id: Option<String>,
}

#[derive(Debug, SurrealValue)]
struct UserTypeRowWithId {
    record_id: String,
    name: String,
    slug: String,
    description: String,
    group_id: Option<String>,
}

impl UserTypeRow {
    fn into_user_type(self, id: Uuid) -> Result<UserType, DbError> {
        Ok(UserType {
            id,
            name: self.name,
            slug: self.slug,
            description: self.description,
            group_id: parse_optional_uuid(self.group_id.as_deref())?,
        })
    }
}

impl UserTypeRowWithId {
    fn try_into_user_type(self) -> Result<UserType, DbError> {
        let id = parse_uuid(&self.record_id)?;
        UserTypeRow {
            name: self.name,
            slug: self.slug,
            description: self.description,
            group_id: self.group_id,
        }
        .into_user_type(id)
    }
}

/// SurrealDB implementation of the user-type store.
#[derive(Clone)]
pub struct SurrealUserTypeRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserTypeRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<UserType>, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user_type \
                 WHERE slug = $slug",
            )
            .bind(("slug", slug.to_string()))
            .await?;

        let rows: Vec<UserTypeRowWithId> = result.take(0)?;
        rows.into_iter()
            .next()
            .map(|row| row.try_into_user_type())
            .transpose()
    }
}

impl<C: Connection> UserTypeRepository for SurrealUserTypeRepository<C> {
    async fn create(&self, input: CreateUserType) -> ChambaResult<UserType> {
        let slug = input
            .slug
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ChambaError::Validation {
                message: format!("user type '{}' has no slug", input.name),
            })?;

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('user_type', $id) SET \
                 name = $name, slug = $slug, \
                 description = $description, group_id = NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("slug", slug))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| write_error("user_type", [e]))?;

        let rows: Vec<UserTypeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user_type".into(),
            id: id_str,
        })?;

        Ok(row.into_user_type(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> ChambaResult<UserType> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('user_type', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserTypeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user_type".into(),
            id: id_str,
        })?;

        Ok(row.into_user_type(id)?)
    }

    async fn get_by_slug(&self, slug: &str) -> ChambaResult<UserType> {
        self.find_by_slug(slug).await?.ok_or_else(|| {
            DbError::NotFound {
                entity: "user_type".into(),
                id: format!("slug={slug}"),
            }
            .into()
        })
    }

    async fn update(&self, id: Uuid, input: UpdateUserType) -> ChambaResult<UserType> {
        self.update_with_group_rename(id, input, None).await
    }

    async fn update_with_group_rename(
        &self,
        id: Uuid,
        input: UpdateUserType,
        rename: Option<GroupRename>,
    ) -> ChambaResult<UserType> {
        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.slug.is_some() {
            sets.push("slug = $slug");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.group_id.is_some() {
            sets.push("group_id = $group_id");
        }
        if sets.is_empty() && rename.is_none() {
            return self.get_by_id(id).await;
        }

        let mut statements = vec!["BEGIN TRANSACTION;".to_string()];
        if rename.is_some() {
            statements.push(
                "UPDATE type::record('perm_group', $rename_group) SET \
                 name = $rename_to, updated_at = time::now();"
                    .to_string(),
            );
        }
        if !sets.is_empty() {
            statements.push(format!(
                "UPDATE type::record('user_type', $id) SET {};",
                sets.join(", ")
            ));
        }
        statements.push("COMMIT TRANSACTION;".to_string());

        let mut builder = self
            .db
            .query(statements.join(" "))
            .bind(("id", id.to_string()));

        if let Some(rename) = rename {
            builder = builder
                .bind(("rename_group", rename.group_id.to_string()))
                .bind(("rename_to", rename.name));
        }
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(slug) = input.slug {
            builder = builder.bind(("slug", slug));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(group_id) = input.group_id {
            // Some(None) clears the binding.
            builder = builder.bind(("group_id", group_id.map(|g| g.to_string())));
        }

        let mut response = builder.await.map_err(DbError::from)?;
        let errors = response.take_errors();
        if !errors.is_empty() {
            return Err(write_error("user_type", errors.into_values()));
        }

        self.get_by_id(id).await
    }

    async fn list(&self) -> ChambaResult<Vec<UserType>> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM user_type ORDER BY name ASC")
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserTypeRowWithId> = result.take(0).map_err(DbError::from)?;

        let types = rows
            .into_iter()
            .map(|row| row.try_into_user_type())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(types)
    }

    async fn get_or_create_by_slug(
        &self,
        slug: &str,
        defaults: CreateUserType,
    ) -> ChambaResult<(UserType, bool)> {
        if let Some(existing) = self.find_by_slug(slug).await? {
            return Ok((existing, false));
        }

        let input = CreateUserType {
            slug: Some(slug.to_string()),
            ..defaults
        };
        match self.create(input).await {
            Ok(created) => Ok((created, true)),
            // Lost a race on the unique slug; the other writer's row wins.
            Err(ChambaError::AlreadyExists { entity }) => self
                .find_by_slug(slug)
                .await?
                .map(|existing| (existing, false))
                .ok_or(ChambaError::AlreadyExists { entity }),
            Err(e) => Err(e),
        }
    }
}
