//! The `equal_nest` behavior
//!
//! Attached to an (empty) table, it turns that table into the junction of a
//! symmetric self-relationship over `parent_table`.

use std::collections::BTreeMap;

use tracing::debug;

use super::JunctionTable;
use crate::error::{NestError, Result};
use crate::schema::Schema;

/// Behavior name as written in schema documents.
pub const EQUAL_NEST: &str = "equal_nest";

pub const DEFAULT_FIRST_COLUMN: &str = "first_id";
pub const DEFAULT_SECOND_COLUMN: &str = "second_id";

const PARENT_TABLE: &str = "parent_table";
const REFERENCE_COLUMN_1: &str = "reference_column_1";
const REFERENCE_COLUMN_2: &str = "reference_column_2";

/// Validated parameters of one `equal_nest` behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EqualNestBehavior {
    table: String,
    parent_table: String,
    first_column: String,
    second_column: String,
}

impl EqualNestBehavior {
    /// Read the behavior parameters declared on `table`.
    pub fn from_parameters(table: &str, parameters: &BTreeMap<String, String>) -> Result<Self> {
        let parent_table = parameter(parameters, PARENT_TABLE).ok_or(
            NestError::MissingParameter {
                behavior: EQUAL_NEST,
                parameter: PARENT_TABLE,
            },
        )?;

        let first_column =
            parameter(parameters, REFERENCE_COLUMN_1).unwrap_or(DEFAULT_FIRST_COLUMN);
        let second_column =
            parameter(parameters, REFERENCE_COLUMN_2).unwrap_or(DEFAULT_SECOND_COLUMN);

        if first_column == second_column {
            return Err(NestError::UnsupportedSchema(format!(
                "{}: both reference columns are named `{}`",
                table, first_column
            )));
        }

        Ok(Self {
            table: table.to_string(),
            parent_table: parent_table.to_string(),
            first_column: first_column.to_string(),
            second_column: second_column.to_string(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn parent_table(&self) -> &str {
        &self.parent_table
    }

    /// Validate against the schema and derive the junction table.
    ///
    /// The two reference columns copy the parent key's type and size exactly.
    pub fn configure(&self, schema: &Schema) -> Result<JunctionTable> {
        let parent = schema
            .find_table(&self.parent_table)
            .ok_or_else(|| NestError::UnknownTable(self.parent_table.clone()))?;

        let key = match parent.primary_keys().as_slice() {
            [key] => *key,
            [] => {
                return Err(NestError::UnsupportedSchema(format!(
                    "{}: parent table `{}` has no primary key",
                    self.table, parent.name
                )));
            }
            _ => {
                return Err(NestError::UnsupportedSchema(format!(
                    "{}: parent table `{}` has multiple primary keys",
                    self.table, parent.name
                )));
            }
        };

        let declares_columns = schema
            .find_table(&self.table)
            .is_some_and(|t| !t.columns.is_empty());
        if declares_columns {
            return Err(NestError::UnsupportedSchema(format!(
                "{}: an equal_nest table cannot declare its own columns",
                self.table
            )));
        }

        debug!(
            table = %self.table,
            parent = %parent.name,
            key_type = %key.sql_type(),
            "Configured equal_nest junction"
        );

        Ok(JunctionTable {
            name: self.table.clone(),
            parent_table: parent.name.clone(),
            parent_key: key.name.clone(),
            first_column: self.first_column.clone(),
            second_column: self.second_column.clone(),
            key_type: key.column_type,
            key_size: key.size,
        })
    }
}

fn parameter<'a>(parameters: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    parameters
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{BehaviorSchema, ColumnSchema, ColumnType, TableSchema};
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    fn person(key_type: ColumnType) -> TableSchema {
        TableSchema::new("person")
            .column(ColumnSchema::primary("id", key_type))
            .column(ColumnSchema::new("name", ColumnType::Varchar).required())
    }

    fn nest(parent: &str) -> BehaviorSchema {
        BehaviorSchema::new(EQUAL_NEST).parameter(PARENT_TABLE, parent)
    }

    fn configure(schema: &Schema, table: &str) -> Result<JunctionTable> {
        let behavior = schema
            .find_table(table)
            .and_then(|t| t.find_behavior(EQUAL_NEST))
            .unwrap();
        EqualNestBehavior::from_parameters(table, &behavior.parameters)?.configure(schema)
    }

    #[test]
    fn test_missing_parent_table() {
        let err = EqualNestBehavior::from_parameters("friend", &BTreeMap::new()).unwrap_err();
        assert_matches!(
            err,
            NestError::MissingParameter {
                parameter: "parent_table",
                ..
            }
        );
        assert!(err.is_configuration());
    }

    #[test]
    fn test_blank_parent_table_is_missing() {
        let mut parameters = BTreeMap::new();
        parameters.insert(PARENT_TABLE.to_string(), "  ".to_string());
        assert_matches!(
            EqualNestBehavior::from_parameters("friend", &parameters),
            Err(NestError::MissingParameter { .. })
        );
    }

    #[test]
    fn test_defaults() {
        let schema = Schema::new()
            .table(person(ColumnType::Integer))
            .table(TableSchema::new("friend").behavior(nest("person")));

        let junction = configure(&schema, "friend").unwrap();
        assert_eq!(junction.name, "friend");
        assert_eq!(junction.parent_table, "person");
        assert_eq!(junction.parent_key, "id");
        assert_eq!(junction.first_column, DEFAULT_FIRST_COLUMN);
        assert_eq!(junction.second_column, DEFAULT_SECOND_COLUMN);
    }

    #[test]
    fn test_multiple_primary_keys() {
        let mut parent = person(ColumnType::Integer);
        parent
            .columns
            .push(ColumnSchema::primary("id_2", ColumnType::Integer));
        let schema = Schema::new()
            .table(parent)
            .table(TableSchema::new("friend").behavior(nest("person")));

        let err = configure(&schema, "friend").unwrap_err();
        assert_matches!(&err, NestError::UnsupportedSchema(msg) if msg.contains("multiple primary keys"));
    }

    #[test]
    fn test_no_primary_key() {
        let schema = Schema::new()
            .table(TableSchema::new("person").column(ColumnSchema::new("name", ColumnType::Text)))
            .table(TableSchema::new("friend").behavior(nest("person")));

        assert_matches!(
            configure(&schema, "friend"),
            Err(NestError::UnsupportedSchema(_))
        );
    }

    #[test]
    fn test_unknown_parent_table() {
        let schema = Schema::new().table(TableSchema::new("friend").behavior(nest("people")));
        assert_matches!(
            configure(&schema, "friend"),
            Err(NestError::UnknownTable(name)) if name == "people"
        );
    }

    #[test]
    fn test_key_type_is_propagated() {
        let schema = Schema::new()
            .table(person(ColumnType::BigInt))
            .table(TableSchema::new("friend").behavior(nest("person")));

        let junction = configure(&schema, "friend").unwrap();
        let parent_key = schema.find_table("person").unwrap().primary_keys()[0].clone();
        for column in junction.columns() {
            assert!(column.primary_key);
            assert_eq!(column.column_type, parent_key.column_type);
            assert_eq!(column.sql_type(), "BIGINT");
        }
    }

    #[test]
    fn test_key_size_is_propagated() {
        let mut code = ColumnSchema::new("code", ColumnType::Varchar).with_size(12);
        code.primary_key = true;
        let schema = Schema::new()
            .table(TableSchema::new("person").column(code))
            .table(TableSchema::new("friend").behavior(nest("person")));

        let junction = configure(&schema, "friend").unwrap();
        assert_eq!(junction.columns()[0].sql_type(), "VARCHAR(12)");
        assert_eq!(junction.columns()[1].sql_type(), "VARCHAR(12)");
    }

    #[test]
    fn test_custom_reference_columns() {
        let behavior = nest("person")
            .parameter(REFERENCE_COLUMN_1, "person_a")
            .parameter(REFERENCE_COLUMN_2, "person_b");
        let schema = Schema::new()
            .table(person(ColumnType::Integer))
            .table(TableSchema::new("friend").behavior(behavior));

        let junction = configure(&schema, "friend").unwrap();
        assert_eq!(junction.first_column, "person_a");
        assert_eq!(junction.second_column, "person_b");
    }

    #[test]
    fn test_same_reference_columns() {
        let behavior = nest("person")
            .parameter(REFERENCE_COLUMN_1, "pid")
            .parameter(REFERENCE_COLUMN_2, "pid");
        assert_matches!(
            EqualNestBehavior::from_parameters("friend", &behavior.parameters),
            Err(NestError::UnsupportedSchema(_))
        );
    }

    #[test]
    fn test_junction_with_columns() {
        let schema = Schema::new().table(person(ColumnType::Integer)).table(
            TableSchema::new("friend")
                .column(ColumnSchema::new("since", ColumnType::Timestamp))
                .behavior(nest("person")),
        );
        assert_matches!(
            configure(&schema, "friend"),
            Err(NestError::UnsupportedSchema(_))
        );
    }
}
