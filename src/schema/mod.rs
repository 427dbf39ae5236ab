//! Declarative schema documents
//!
//! A schema lists tables, their columns and the behaviors attached to them.
//! Documents are usually written in YAML:
//!
//! ```yaml
//! name: social
//! tables:
//!   - name: person
//!     columns:
//!       - { name: id, type: INTEGER, primary_key: true, auto_increment: true, required: true }
//!       - { name: name, type: VARCHAR, size: 255, required: true }
//!   - name: friend
//!     behaviors:
//!       - name: equal_nest
//!         parameters: { parent_table: person }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::behavior::{EQUAL_NEST, EqualNestBehavior, JunctionTable};
use crate::error::{NestError, Result};

/// Column types understood by the schema compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Boolean,
    Char,
    Varchar,
    Text,
    Timestamp,
}

impl ColumnType {
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ColumnType::TinyInt | ColumnType::SmallInt | ColumnType::Integer | ColumnType::BigInt
        )
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            ColumnType::TinyInt => "TINYINT",
            ColumnType::SmallInt => "SMALLINT",
            ColumnType::Integer => "INTEGER",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Real => "REAL",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Char => "CHAR",
            ColumnType::Varchar => "VARCHAR",
            ColumnType::Text => "TEXT",
            ColumnType::Timestamp => "TIMESTAMP",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default)]
    pub required: bool,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            size: None,
            primary_key: false,
            auto_increment: false,
            required: false,
        }
    }

    /// Auto-incrementing, required primary-key column.
    pub fn primary(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            primary_key: true,
            auto_increment: true,
            required: true,
            ..Self::new(name, column_type)
        }
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// SQL type including the size, e.g. `VARCHAR(255)`.
    pub fn sql_type(&self) -> String {
        match self.size {
            Some(size) => format!("{}({})", self.column_type.as_sql(), size),
            None => self.column_type.as_sql().to_string(),
        }
    }

    /// Column definition fragment for a CREATE TABLE statement.
    ///
    /// `inline_key` is set when this column is the table's only primary key.
    fn to_sql(&self, inline_key: bool) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type());

        if inline_key {
            sql.push_str(" PRIMARY KEY");
            // SQLite only accepts AUTOINCREMENT on an INTEGER rowid alias
            if self.auto_increment && self.column_type == ColumnType::Integer {
                sql.push_str(" AUTOINCREMENT");
            }
        } else if self.required || self.primary_key {
            sql.push_str(" NOT NULL");
        }

        sql
    }
}

/// A behavior attached to a table, with its raw parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BehaviorSchema {
    pub name: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl BehaviorSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ColumnSchema>,
    #[serde(default)]
    pub behaviors: Vec<BehaviorSchema>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            behaviors: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnSchema) -> Self {
        self.columns.push(column);
        self
    }

    pub fn behavior(mut self, behavior: BehaviorSchema) -> Self {
        self.behaviors.push(behavior);
        self
    }

    pub fn primary_keys(&self) -> Vec<&ColumnSchema> {
        self.columns.iter().filter(|c| c.primary_key).collect()
    }

    pub fn find_behavior(&self, name: &str) -> Option<&BehaviorSchema> {
        self.behaviors.iter().find(|b| b.name == name)
    }

    /// Generate CREATE TABLE IF NOT EXISTS SQL
    pub fn create_table_sql(&self) -> String {
        let keys = self.primary_keys();
        let single_key = keys.len() == 1;

        let mut defs: Vec<String> = self
            .columns
            .iter()
            .map(|c| c.to_sql(single_key && c.primary_key))
            .collect();

        if keys.len() > 1 {
            let names: Vec<&str> = keys.iter().map(|c| c.name.as_str()).collect();
            defs.push(format!("PRIMARY KEY ({})", names.join(", ")));
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
            self.name,
            defs.join(",\n  ")
        )
    }
}

/// A whole schema document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub tables: Vec<TableSchema>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml(source: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn table(mut self, table: TableSchema) -> Self {
        self.tables.push(table);
        self
    }

    pub fn find_table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Configure every `equal_nest` behavior in the document.
    ///
    /// Fails on the first invalid configuration; other behaviors are left to
    /// their own compilers and skipped here.
    pub fn junction_tables(&self) -> Result<Vec<JunctionTable>> {
        let mut junctions = Vec::new();

        for table in &self.tables {
            for behavior in &table.behaviors {
                if behavior.name != EQUAL_NEST {
                    warn!(
                        table = %table.name,
                        behavior = %behavior.name,
                        "Skipping unknown behavior"
                    );
                    continue;
                }
                let nest = EqualNestBehavior::from_parameters(&table.name, &behavior.parameters)?;
                junctions.push(nest.configure(self)?);
            }
        }

        Ok(junctions)
    }

    /// Full DDL for the document: plain tables first, then the junction
    /// tables and their indexes.
    pub fn create_sql(&self) -> Result<Vec<String>> {
        let junctions = self.junction_tables()?;

        let mut statements: Vec<String> = self
            .tables
            .iter()
            .filter(|t| !junctions.iter().any(|j| j.name == t.name))
            .map(|t| t.create_table_sql())
            .collect();

        for junction in &junctions {
            statements.push(junction.create_table_sql());
            statements.extend(junction.index_sql());
        }

        Ok(statements)
    }
}

impl TryFrom<&str> for Schema {
    type Error = NestError;

    fn try_from(source: &str) -> Result<Self> {
        Schema::from_yaml(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOCUMENT: &str = r#"
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

    #[test]
    fn test_integer_types() {
        assert!(ColumnType::Integer.is_integer());
        assert!(ColumnType::BigInt.is_integer());
        assert!(!ColumnType::Varchar.is_integer());
        assert!(!ColumnType::Real.is_integer());
    }

    #[test]
    fn test_parse_document() {
        let schema = Schema::from_yaml(DOCUMENT).unwrap();
        assert_eq!(schema.name.as_deref(), Some("social"));
        assert_eq!(schema.tables.len(), 2);

        let person = schema.find_table("person").unwrap();
        assert_eq!(person.primary_keys().len(), 1);
        assert_eq!(person.columns[1].sql_type(), "VARCHAR(255)");

        let friend = schema.find_table("friend").unwrap();
        assert!(friend.columns.is_empty());
        assert_eq!(
            friend.find_behavior("equal_nest").unwrap().parameters["parent_table"],
            "person"
        );
    }

    #[test]
    fn test_create_table_sql() {
        let schema = Schema::from_yaml(DOCUMENT).unwrap();
        assert_eq!(
            schema.find_table("person").unwrap().create_table_sql(),
            "CREATE TABLE IF NOT EXISTS person (\n  id INTEGER PRIMARY KEY AUTOINCREMENT,\n  name VARCHAR(255) NOT NULL\n)"
        );
    }

    #[test]
    fn test_composite_key_sql() {
        let mut table = TableSchema::new("pair")
            .column(ColumnSchema::new("a", ColumnType::Integer).required())
            .column(ColumnSchema::new("b", ColumnType::Integer).required());
        table.columns.iter_mut().for_each(|c| c.primary_key = true);

        assert_eq!(
            table.create_table_sql(),
            "CREATE TABLE IF NOT EXISTS pair (\n  a INTEGER NOT NULL,\n  b INTEGER NOT NULL,\n  PRIMARY KEY (a, b)\n)"
        );
    }

    #[test]
    fn test_create_sql_replaces_behavior_table() {
        let schema = Schema::from_yaml(DOCUMENT).unwrap();
        let statements = schema.create_sql().unwrap();

        assert!(statements[0].starts_with("CREATE TABLE IF NOT EXISTS person"));
        assert!(statements[1].starts_with("CREATE TABLE IF NOT EXISTS friend"));
        assert!(statements[1].contains("first_id INTEGER NOT NULL"));
        assert!(statements.iter().skip(2).all(|s| s.contains("INDEX")));
    }

    #[test]
    fn test_unknown_behavior_is_skipped() {
        let schema = Schema::new()
            .table(
                TableSchema::new("person")
                    .column(ColumnSchema::primary("id", ColumnType::Integer))
                    .behavior(BehaviorSchema::new("timestampable")),
            );
        assert!(schema.junction_tables().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_document() {
        let err = Schema::from_yaml("tables: [ { columns: 3 } ]").unwrap_err();
        assert!(matches!(err, NestError::InvalidSchema(_)));
        assert!(err.is_configuration());
    }
}
