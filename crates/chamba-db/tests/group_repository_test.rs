//! Integration tests for the permission-group repository using in-memory
//! SurrealDB.

use chamba_core::models::account::CreateAccount;
use chamba_core::repository::{AccountRepository, PermissionGroupRepository};
use chamba_db::repository::{SurrealAccountRepository, SurrealPermissionGroupRepository};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

/// Helper: spin up in-memory DB, run migrations, create one account.
async fn setup() -> (Surreal<Db>, Uuid) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    chamba_db::run_migrations(&db).await.unwrap();

    let account = SurrealAccountRepository::new(db.clone())
        .create(CreateAccount {
            username: "lucia".into(),
            email: "lucia@example.com".into(),
            display_name: "Lucía".into(),
            password: "semillas-2024".into(),
        })
        .await
        .unwrap();

    (db, account.id)
}

fn names(groups: &[chamba_core::models::group::PermissionGroup]) -> Vec<&str> {
    groups.iter().map(|g| g.name.as_str()).collect()
}

#[tokio::test]
async fn get_or_create_returns_the_same_group() {
    let (db, _) = setup().await;
    let repo = SurrealPermissionGroupRepository::new(db);

    let first = repo.get_or_create_by_name("role:externo").await.unwrap();
    let second = repo.get_or_create_by_name("role:externo").await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.name, "role:externo");
    assert_eq!(repo.get_by_id(first.id).await.unwrap().name, "role:externo");
}

#[tokio::test]
async fn rename_keeps_identity_and_members() {
    let (db, account_id) = setup().await;
    let repo = SurrealPermissionGroupRepository::new(db);

    let group = repo.get_or_create_by_name("role:residente").await.unwrap();
    repo.add_member(group.id, account_id).await.unwrap();

    let renamed = repo.rename(group.id, "role:miembro").await.unwrap();
    assert_eq!(renamed.id, group.id);
    assert_eq!(renamed.name, "role:miembro");

    let groups = repo.get_account_groups(account_id).await.unwrap();
    assert_eq!(names(&groups), vec!["role:miembro"]);
}

#[tokio::test]
async fn add_member_is_idempotent() {
    let (db, account_id) = setup().await;
    let repo = SurrealPermissionGroupRepository::new(db.clone());

    let group = repo.get_or_create_by_name("editores").await.unwrap();
    repo.add_member(group.id, account_id).await.unwrap();
    repo.add_member(group.id, account_id).await.unwrap();

    let mut result = db.query("SELECT * FROM member_of").await.unwrap();
    let edges: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(edges.len(), 1);

    repo.remove_member(group.id, account_id).await.unwrap();
    assert!(repo.get_account_groups(account_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn add_member_to_unknown_group_fails() {
    let (db, account_id) = setup().await;
    let repo = SurrealPermissionGroupRepository::new(db);

    let result = repo.add_member(Uuid::new_v4(), account_id).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn list_by_name_prefix_filters() {
    let (db, _) = setup().await;
    let repo = SurrealPermissionGroupRepository::new(db);

    for name in ["role:residente", "editores", "role:externo"] {
        repo.get_or_create_by_name(name).await.unwrap();
    }

    let groups = repo.list_by_name_prefix("role:").await.unwrap();
    assert_eq!(names(&groups), vec!["role:externo", "role:residente"]);
}

#[tokio::test]
async fn replace_prefixed_membership_keeps_other_groups() {
    let (db, account_id) = setup().await;
    let repo = SurrealPermissionGroupRepository::new(db);

    let externo = repo.get_or_create_by_name("role:externo").await.unwrap();
    let stray = repo.get_or_create_by_name("role:antiguo").await.unwrap();
    let residente = repo.get_or_create_by_name("role:residente").await.unwrap();
    let editores = repo.get_or_create_by_name("editores").await.unwrap();

    repo.add_member(externo.id, account_id).await.unwrap();
    repo.add_member(stray.id, account_id).await.unwrap();
    repo.add_member(editores.id, account_id).await.unwrap();

    repo.replace_prefixed_membership(account_id, "role:", Some(residente.id))
        .await
        .unwrap();

    let groups = repo.get_account_groups(account_id).await.unwrap();
    assert_eq!(names(&groups), vec!["editores", "role:residente"]);

    repo.replace_prefixed_membership(account_id, "role:", None)
        .await
        .unwrap();
    let groups = repo.get_account_groups(account_id).await.unwrap();
    assert_eq!(names(&groups), vec!["editores"]);
}

/// Raw `member_of` edges from the account, duplicates included.
async fn edge_count(db: &Surreal<Db>, account_id: Uuid) -> usize {
    let mut result = db
        .query("SELECT VALUE out FROM member_of WHERE in = type::record('account', $account_id)")
        .bind(("account_id", account_id.to_string()))
        .await
        .unwrap();
    let rows: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    rows.len()
}

#[tokio::test]
async fn resaving_into_an_unprefixed_group_keeps_one_edge() {
    let (db, account_id) = setup().await;
    let repo = SurrealPermissionGroupRepository::new(db.clone());
    let talleristas = repo.get_or_create_by_name("talleristas").await.unwrap();

    for _ in 0..3 {
        repo.replace_prefixed_membership(account_id, "role:", Some(talleristas.id))
            .await
            .unwrap();
    }

    assert_eq!(edge_count(&db, account_id).await, 1);
    let groups = repo.get_account_groups(account_id).await.unwrap();
    assert_eq!(names(&groups), vec!["talleristas"]);
}

#[tokio::test]
async fn missing_group_gets_no_edge() {
    let (db, account_id) = setup().await;
    let repo = SurrealPermissionGroupRepository::new(db.clone());
    let externo = repo.get_or_create_by_name("role:externo").await.unwrap();
    repo.add_member(externo.id, account_id).await.unwrap();

    repo.replace_prefixed_membership(account_id, "role:", Some(Uuid::new_v4()))
        .await
        .unwrap();

    assert_eq!(edge_count(&db, account_id).await, 0);
}

#[tokio::test]
async fn remove_member_drops_the_edge() {
    let (db, account_id) = setup().await;
    let repo = SurrealPermissionGroupRepository::new(db.clone());
    let editores = repo.get_or_create_by_name("editores").await.unwrap();
    repo.add_member(editores.id, account_id).await.unwrap();

    repo.remove_member(editores.id, account_id).await.unwrap();
    repo.remove_member(editores.id, account_id).await.unwrap();

    assert_eq!(edge_count(&db, account_id).await, 0);
}

#[tokio::test]
async fn rename_onto_a_taken_name_is_a_conflict() {
    let (db, _) = setup().await;
    let repo = SurrealPermissionGroupRepository::new(db);
    repo.get_or_create_by_name("role:residente").await.unwrap();
    let miembro = repo.get_or_create_by_name("role:miembro").await.unwrap();

    let result = repo.rename(miembro.id, "role:residente").await;
    assert!(matches!(
        result,
        Err(chamba_core::error::ChambaError::AlreadyExists { .. })
    ));
}
