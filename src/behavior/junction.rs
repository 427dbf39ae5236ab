//! Junction table derived from an `equal_nest` behavior.

use serde::Serialize;

use crate::schema::{ColumnSchema, ColumnType};

/// Auxiliary table holding unordered pairs of parent ids.
///
/// Pairs are stored normalised (`first <= second`), so the composite primary
/// key already rejects duplicates written through the store. The unique
/// expression index covers rows written by anything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JunctionTable {
    pub name: String,
    pub parent_table: String,
    pub parent_key: String,
    pub first_column: String,
    pub second_column: String,
    pub key_type: ColumnType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_size: Option<u32>,
}

impl JunctionTable {
    /// The two reference columns, both part of the junction's primary key.
    pub fn columns(&self) -> [ColumnSchema; 2] {
        [
            self.reference_column(&self.first_column),
            self.reference_column(&self.second_column),
        ]
    }

    fn reference_column(&self, name: &str) -> ColumnSchema {
        ColumnSchema {
            name: name.to_string(),
            column_type: self.key_type,
            size: self.key_size,
            primary_key: true,
            auto_increment: false,
            required: true,
        }
    }

    /// Generate CREATE TABLE IF NOT EXISTS SQL
    pub fn create_table_sql(&self) -> String {
        let mut defs: Vec<String> = self
            .columns()
            .iter()
            .map(|c| format!("{} {} NOT NULL", c.name, c.sql_type()))
            .collect();

        defs.push(format!(
            "PRIMARY KEY ({}, {})",
            self.first_column, self.second_column
        ));
        for column in [&self.first_column, &self.second_column] {
            defs.push(format!(
                "FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE CASCADE",
                column, self.parent_table, self.parent_key
            ));
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
            self.name,
            defs.join(",\n  ")
        )
    }

    /// Index statements: uniqueness over the unordered pair and the reverse
    /// lookup path `(second, first)`.
    pub fn index_sql(&self) -> Vec<String> {
        vec![
            format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_{table}_pair ON {table} (min({a}, {b}), max({a}, {b}))",
                table = self.name,
                a = self.first_column,
                b = self.second_column
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_reverse ON {table} ({b}, {a})",
                table = self.name,
                a = self.first_column,
                b = self.second_column
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn friend() -> JunctionTable {
        JunctionTable {
            name: "friend".to_string(),
            parent_table: "person".to_string(),
            parent_key: "id".to_string(),
            first_column: "first_id".to_string(),
            second_column: "second_id".to_string(),
            key_type: ColumnType::BigInt,
            key_size: None,
        }
    }

    #[test]
    fn test_create_table_sql() {
        assert_eq!(
            friend().create_table_sql(),
            "CREATE TABLE IF NOT EXISTS friend (\n  \
             first_id BIGINT NOT NULL,\n  \
             second_id BIGINT NOT NULL,\n  \
             PRIMARY KEY (first_id, second_id),\n  \
             FOREIGN KEY (first_id) REFERENCES person (id) ON DELETE CASCADE,\n  \
             FOREIGN KEY (second_id) REFERENCES person (id) ON DELETE CASCADE\n)"
        );
    }

    #[test]
    fn test_index_sql() {
        let indexes = friend().index_sql();
        assert_eq!(
            indexes[0],
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_friend_pair ON friend (min(first_id, second_id), max(first_id, second_id))"
        );
        assert_eq!(
            indexes[1],
            "CREATE INDEX IF NOT EXISTS idx_friend_reverse ON friend (second_id, first_id)"
        );
    }

    #[test]
    fn test_serialize_report() {
        let json = serde_json::to_value(friend()).unwrap();
        assert_eq!(json["key_type"], "BIGINT");
        assert!(json.get("key_size").is_none());
    }
}
