//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    chamba_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    for table in [
        "account",
        "perm_group",
        "member_of",
        "user_type",
        "user_profile",
        "_migration",
    ] {
        assert!(info_str.contains(table), "missing {table} table");
    }
}

#[tokio::test]
async fn migration_is_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    chamba_db::run_migrations(&db).await.unwrap();
    chamba_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("SELECT * FROM _migration").await.unwrap();
    let records: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(records.len(), 2, "expected one record per migration");
}

#[tokio::test]
async fn unique_index_prevents_duplicate_group_names() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    chamba_db::run_migrations(&db).await.unwrap();

    db.query("CREATE perm_group SET name = 'role:externo'")
        .await
        .unwrap()
        .check()
        .unwrap();

    let result = db
        .query("CREATE perm_group SET name = 'role:externo'")
        .await
        .unwrap()
        .check();

    assert!(result.is_err(), "duplicate group name should be rejected");
}
