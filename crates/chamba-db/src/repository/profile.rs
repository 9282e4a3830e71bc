//! SurrealDB implementation of [`ProfileRepository`].
//!
//! Profiles are keyed by account: the record id is the account's UUID,
//! which together with the unique `account_id` index keeps the
//! one-profile-per-account invariant.

use chamba_core::error::{ChambaError, ChambaResult};
use chamba_core::models::profile::{CreateProfile, UpdateProfile, UserProfile};
use chamba_core::repository::ProfileRepository;
use chrono::{DateTime, NaiveDate, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{parse_uuid, write_error};
use crate::error::DbError;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, SurrealValue)]
struct ProfileRow {
    account_id: String,
    user_type_id: String,
    display_name: String,
    phone: String,
    bio: String,
    community_role: String,
    contribution_areas: String,
    availability: String,
    resident_since: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProfileRow {
    fn try_into_profile(self) -> Result<UserProfile, DbError> {
        let account_id = parse_uuid(&self.account_id)?;
        let resident_since = self
            .resident_since
            .as_deref()
            .map(|d| {
                NaiveDate::parse_from_str(d, DATE_FORMAT)
                    .map_err(|e| DbError::InvalidData(format!("invalid date {d}: {e}")))
            })
            .transpose()?;

        Ok(UserProfile {
            id: account_id,
            account_id,
            user_type_id: parse_uuid(&self.user_type_id)?,
            display_name: self.display_name,
            phone: self.phone,
            bio: self.bio,
            community_role: self.community_role,
            contribution_areas: self.contribution_areas,
            availability: self.availability,
            resident_since,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the profile store.
#[derive(Clone)]
pub struct SurrealProfileRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealProfileRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn find_by_account(&self, account_id: Uuid) -> Result<Option<UserProfile>, DbError> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('user_profile', $id)")
            .bind(("id", account_id.to_string()))
            .await?;

        let rows: Vec<ProfileRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .map(|row| row.try_into_profile())
            .transpose()
    }
}

impl<C: Connection> ProfileRepository for SurrealProfileRepository<C> {
    async fn create(&self, input: CreateProfile) -> ChambaResult<UserProfile> {
        let id_str = input.account_id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('user_profile', $id) SET \
                 account_id = $id, user_type_id = $user_type_id, \
                 display_name = $display_name",
            )
            .bind(("id", id_str.clone()))
            .bind(("user_type_id", input.user_type_id.to_string()))
            .bind(("display_name", input.display_name))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| write_error("user_profile", [e]))?;

        let rows: Vec<ProfileRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user_profile".into(),
            id: id_str,
        })?;

        Ok(row.try_into_profile()?)
    }

    async fn get_by_account(&self, account_id: Uuid) -> ChambaResult<UserProfile> {
        self.find_by_account(account_id).await?.ok_or_else(|| {
            DbError::NotFound {
                entity: "user_profile".into(),
                id: account_id.to_string(),
            }
            .into()
        })
    }

    async fn get_or_create(&self, input: CreateProfile) -> ChambaResult<(UserProfile, bool)> {
        let account_id = input.account_id;
        if let Some(existing) = self.find_by_account(account_id).await? {
            return Ok((existing, false));
        }

        match self.create(input).await {
            Ok(created) => Ok((created, true)),
            Err(ChambaError::AlreadyExists { entity }) => self
                .find_by_account(account_id)
                .await?
                .map(|existing| (existing, false))
                .ok_or(ChambaError::AlreadyExists { entity }),
            Err(e) => Err(e),
        }
    }

    async fn update(&self, account_id: Uuid, input: UpdateProfile) -> ChambaResult<UserProfile> {
        let id_str = account_id.to_string();

        let mut sets = Vec::new();
        if input.user_type_id.is_some() {
            sets.push("user_type_id = $user_type_id");
        }
        if input.display_name.is_some() {
            sets.push("display_name = $display_name");
        }
        if input.phone.is_some() {
            sets.push("phone = $phone");
        }
        if input.bio.is_some() {
            sets.push("bio = $bio");
        }
        if input.community_role.is_some() {
            sets.push("community_role = $community_role");
        }
        if input.contribution_areas.is_some() {
            sets.push("contribution_areas = $contribution_areas");
        }
        if input.availability.is_some() {
            sets.push("availability = $availability");
        }
        if input.resident_since.is_some() {
            sets.push("resident_since = $resident_since");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('user_profile', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(user_type_id) = input.user_type_id {
            builder = builder.bind(("user_type_id", user_type_id.to_string()));
        }
        if let Some(display_name) = input.display_name {
            builder = builder.bind(("display_name", display_name));
        }
        if let Some(phone) = input.phone {
            builder = builder.bind(("phone", phone));
        }
        if let Some(bio) = input.bio {
            builder = builder.bind(("bio", bio));
        }
        if let Some(community_role) = input.community_role {
            builder = builder.bind(("community_role", community_role));
        }
        if let Some(contribution_areas) = input.contribution_areas {
            builder = builder.bind(("contribution_areas", contribution_areas));
        }
        if let Some(availability) = input.availability {
            builder = builder.bind(("availability", availability));
        }
        if let Some(resident_since) = input.resident_since {
            builder = builder.bind((
                "resident_since",
                resident_since.map(|d| d.format(DATE_FORMAT).to_string()),
            ));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| write_error("user_profile", [e]))?;

        let rows: Vec<ProfileRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user_profile".into(),
            id: id_str,
        })?;

        Ok(row.try_into_profile()?)
    }
}
