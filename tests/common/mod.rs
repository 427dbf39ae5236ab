//! Shared fixtures: a `person` parent table with a `friend` equal nest.

#![allow(dead_code)]

use equal_nest::{
    ColumnSchema, ColumnType, Database, DatabaseEntity, DatabaseSchema, EntityId, FromSqlRow,
    InstanceId, ParentEntity, RelationshipManager, Schema, TableSchema, sync_schema,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

pub const SCHEMA: &str = r#"
name: social
tables:
  - name: person
    columns:
      - { name: id, type: INTEGER, primary_key: true, auto_increment: true, required: true }
      - { name: name, type: VARCHAR, size: 255, required: true }
  - name: friend
    behaviors:
      - name: equal_nest
        parameters: { parent_table: person }
"#;

#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub id: Option<EntityId>,
    pub name: String,
}

impl Person {
    pub fn new(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
        }
    }
}

impl DatabaseEntity for Person {
    const TABLE_NAME: &'static str = "person";
    const PRIMARY_KEY: &'static str = "id";

    fn column_names() -> &'static [&'static str] {
        &["id", "name"]
    }
}

impl DatabaseSchema for Person {
    fn table_schema() -> TableSchema {
        TableSchema::new("person")
            .column(ColumnSchema::primary("id", ColumnType::Integer))
            .column(
                ColumnSchema::new("name", ColumnType::Varchar)
                    .with_size(255)
                    .required(),
            )
    }
}

impl FromSqlRow for Person {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: Some(row.try_get("id")?),
            name: row.try_get("name")?,
        })
    }
}

impl ParentEntity for Person {
    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    async fn insert(&self, conn: &mut SqliteConnection) -> Result<EntityId, sqlx::Error> {
        let result = sqlx::query("INSERT INTO person (name) VALUES (?1)")
            .bind(&self.name)
            .execute(&mut *conn)
            .await?;
        Ok(result.last_insert_rowid())
    }

    async fn update(&self, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE person SET name = ?1 WHERE id = ?2")
            .bind(&self.name)
            .bind(self.id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}

/// Fresh in-memory database with the schema applied, and a manager over it
pub async fn setup() -> (Database, RelationshipManager<Person>) {
    let db = Database::in_memory().await.unwrap();
    let schema = Schema::from_yaml(SCHEMA).unwrap();
    let result = sync_schema(db.pool(), &schema).await.unwrap();
    assert!(result.is_ok(), "{:?}", result.errors);

    let junction = schema.junction_tables().unwrap().remove(0);
    let manager = RelationshipManager::new(db.pool().clone(), junction).unwrap();
    (db, manager)
}

pub fn person(manager: &mut RelationshipManager<Person>, name: &str) -> InstanceId {
    manager.attach(Person::new(name))
}

pub async fn count_rows(db: &Database, table: &str) -> i64 {
    let row: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(db.pool())
        .await
        .unwrap();
    row.0
}

pub fn names(manager: &RelationshipManager<Person>, members: &[InstanceId]) -> Vec<String> {
    let mut names: Vec<String> = members
        .iter()
        .map(|m| manager.entity(*m).unwrap().name.clone())
        .collect();
    names.sort();
    names
}
