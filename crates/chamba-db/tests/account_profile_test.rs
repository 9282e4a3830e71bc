//! Integration tests for the account, user-type and profile repositories
//! using in-memory SurrealDB.

use chamba_core::error::ChambaError;
use chamba_core::models::account::CreateAccount;
use chamba_core::models::profile::{CreateProfile, UpdateProfile};
use chamba_core::models::user_type::{CreateUserType, UpdateUserType};
use chamba_core::repository::{
    AccountRepository, Pagination, ProfileRepository, UserTypeRepository,
};
use chamba_db::repository::{
    SurrealAccountRepository, SurrealProfileRepository, SurrealUserTypeRepository,
};
use chrono::NaiveDate;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    chamba_db::run_migrations(&db).await.unwrap();
    db
}

fn account_input(username: &str) -> CreateAccount {
    CreateAccount {
        username: username.into(),
        email: format!("{username}@example.com"),
        display_name: username.to_uppercase(),
        password: "minga-comunitaria".into(),
    }
}

fn type_input(name: &str, slug: &str) -> CreateUserType {
    CreateUserType {
        name: name.into(),
        slug: Some(slug.into()),
        description: String::new(),
    }
}

#[tokio::test]
async fn account_create_and_lookup() {
    let repo = SurrealAccountRepository::new(setup().await);

    let account = repo.create(account_input("tomas")).await.unwrap();
    assert!(account.password_hash.starts_with("$argon2id$"));
    assert!(!account.password_hash.contains("minga-comunitaria"));

    assert_eq!(repo.get_by_id(account.id).await.unwrap().username, "tomas");
    assert_eq!(repo.get_by_username("tomas").await.unwrap().id, account.id);
    assert!(matches!(
        repo.get_by_username("nadie").await,
        Err(ChambaError::NotFound { .. })
    ));
}

#[tokio::test]
async fn duplicate_username_rejected() {
    let repo = SurrealAccountRepository::new(setup().await);

    repo.create(account_input("tomas")).await.unwrap();
    let result = repo.create(account_input("tomas")).await;
    assert!(matches!(result, Err(ChambaError::AlreadyExists { .. })));
}

#[tokio::test]
async fn account_list_paginates() {
    let repo = SurrealAccountRepository::new(setup().await);
    for name in ["ana", "beto", "carla"] {
        repo.create(account_input(name)).await.unwrap();
    }

    let page = repo
        .list(Pagination {
            offset: 0,
            limit: 2,
        })
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);
}

#[tokio::test]
async fn user_type_requires_slug_and_unique_names() {
    let repo = SurrealUserTypeRepository::new(setup().await);

    let missing = repo
        .create(CreateUserType {
            name: "Editor".into(),
            slug: None,
            description: String::new(),
        })
        .await;
    assert!(matches!(missing, Err(ChambaError::Validation { .. })));

    repo.create(type_input("Residente", "residente")).await.unwrap();
    let dup = repo.create(type_input("Residente", "otro")).await;
    assert!(matches!(dup, Err(ChambaError::AlreadyExists { .. })));
}

#[tokio::test]
async fn user_type_get_or_create_by_slug() {
    let repo = SurrealUserTypeRepository::new(setup().await);

    let (created, was_created) = repo
        .get_or_create_by_slug("externo", type_input("Externo", "ignored"))
        .await
        .unwrap();
    assert!(was_created);
    assert_eq!(created.slug, "externo");
    assert_eq!(created.group_id, None);

    let (again, was_created) = repo
        .get_or_create_by_slug("externo", type_input("Otro", "ignored"))
        .await
        .unwrap();
    assert!(!was_created);
    assert_eq!(again.id, created.id);
    assert_eq!(again.name, "Externo");
}

#[tokio::test]
async fn user_type_update_binds_and_clears_group() {
    let repo = SurrealUserTypeRepository::new(setup().await);
    let tipo = repo.create(type_input("Residente", "residente")).await.unwrap();
    let group_id = uuid::Uuid::new_v4();

    let bound = repo
        .update(
            tipo.id,
            UpdateUserType {
                group_id: Some(Some(group_id)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(bound.group_id, Some(group_id));
    assert_eq!(bound.slug, "residente");

    let cleared = repo
        .update(
            tipo.id,
            UpdateUserType {
                group_id: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(cleared.group_id, None);

    let listed = repo.list().await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn profile_is_unique_per_account() {
    let db = setup().await;
    let accounts = SurrealAccountRepository::new(db.clone());
    let types = SurrealUserTypeRepository::new(db.clone());
    let profiles = SurrealProfileRepository::new(db);

    let account = accounts.create(account_input("ines")).await.unwrap();
    let externo = types.create(type_input("Externo", "externo")).await.unwrap();
    let input = CreateProfile {
        account_id: account.id,
        user_type_id: externo.id,
        display_name: "Inés".into(),
    };

    let (profile, created) = profiles.get_or_create(input.clone()).await.unwrap();
    assert!(created);
    assert_eq!(profile.account_id, account.id);
    assert_eq!(profile.user_type_id, externo.id);

    let (same, created) = profiles.get_or_create(input.clone()).await.unwrap();
    assert!(!created);
    assert_eq!(same.id, profile.id);

    assert!(matches!(
        profiles.create(input).await,
        Err(ChambaError::AlreadyExists { .. })
    ));
}

#[tokio::test]
async fn profile_update_changes_only_given_fields() {
    let db = setup().await;
    let accounts = SurrealAccountRepository::new(db.clone());
    let types = SurrealUserTypeRepository::new(db.clone());
    let profiles = SurrealProfileRepository::new(db);

    let account = accounts.create(account_input("ines")).await.unwrap();
    let externo = types.create(type_input("Externo", "externo")).await.unwrap();
    let residente = types
        .create(type_input("Residente", "residente"))
        .await
        .unwrap();
    profiles
        .create(CreateProfile {
            account_id: account.id,
            user_type_id: externo.id,
            display_name: "Inés".into(),
        })
        .await
        .unwrap();

    let since = NaiveDate::from_ymd_opt(2021, 3, 15).unwrap();
    let updated = profiles
        .update(
            account.id,
            UpdateProfile {
                user_type_id: Some(residente.id),
                phone: Some("+54 9 351 555-0101".into()),
                resident_since: Some(Some(since)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.user_type_id, residente.id);
    assert_eq!(updated.display_name, "Inés");
    assert_eq!(updated.resident_since, Some(since));

    let fetched = profiles.get_by_account(account.id).await.unwrap();
    assert_eq!(fetched, updated);
}
