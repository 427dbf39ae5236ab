//! Schema synchronisation of entity and junction tables

mod common;

use equal_nest::orm::{count, find_by_ids};
use equal_nest::{Database, DatabaseSchema, Schema, sync_junction, sync_schema};
use pretty_assertions::assert_eq;

use common::{Person, person, setup};

#[tokio::test]
async fn test_sync_entity_creates_parent_table() {
    let db = Database::in_memory().await.unwrap();

    let result = equal_nest::db::sync_entity::<Person>(db.pool()).await.unwrap();
    assert_eq!(result.tables_created, vec!["person"]);
    assert!(Person::create_table_sql().contains("id INTEGER PRIMARY KEY AUTOINCREMENT"));

    // Junction over the entity's table
    let schema = Schema::from_yaml(common::SCHEMA).unwrap();
    let junction = schema.junction_tables().unwrap().remove(0);
    let result = sync_junction(db.pool(), &junction).await.unwrap();
    assert!(result.is_ok());
    assert_eq!(result.tables_created, vec!["friend"]);
}

#[tokio::test]
async fn test_repository_lookups() {
    let (db, mut manager) = setup().await;
    let john = person(&mut manager, "john");
    let jean = person(&mut manager, "jean");
    manager.add_related(john, jean).unwrap();
    manager.save(john).await.unwrap();

    let john_id = manager.entity(john).unwrap().id.unwrap();
    let jean_id = manager.entity(jean).unwrap().id.unwrap();

    let mut conn = db.pool().acquire().await.unwrap();
    assert_eq!(count::<Person>(&mut conn).await.unwrap(), 2);

    let found: Vec<Person> = find_by_ids(&mut conn, &[jean_id, 404, john_id]).await.unwrap();
    let names: Vec<&str> = found.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["jean", "john"]);
}

#[tokio::test]
async fn test_wide_parent_key_reaches_the_junction() {
    let db = Database::in_memory().await.unwrap();
    let schema = Schema::from_yaml(
        r#"
tables:
  - name: account
    columns:
      - { name: account_id, type: BIGINT, primary_key: true, required: true }
  - name: contact
    behaviors:
      - name: equal_nest
        parameters: { parent_table: account, reference_column_1: left_id, reference_column_2: right_id }
"#,
    )
    .unwrap();

    let result = sync_schema(db.pool(), &schema).await.unwrap();
    assert!(result.is_ok(), "{:?}", result.errors);

    let columns: Vec<(i32, String, String, i32, Option<String>, i32)> =
        sqlx::query_as("PRAGMA table_info(contact)")
            .fetch_all(db.pool())
            .await
            .unwrap();
    let typed: Vec<(String, String)> = columns
        .into_iter()
        .map(|(_, name, ty, _, _, _)| (name, ty))
        .collect();
    assert_eq!(
        typed,
        vec![
            ("left_id".to_string(), "BIGINT".to_string()),
            ("right_id".to_string(), "BIGINT".to_string()),
        ]
    );
}
