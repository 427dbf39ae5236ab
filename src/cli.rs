//! Minimal CLI parsing for the schema tool.

use std::env;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CliOptions {
    /// Positional schema document path
    pub schema_path: Option<String>,
    /// Create the tables instead of only printing the DDL
    pub apply: bool,
    pub database_url: Option<String>,
    /// Print the junction report as JSON
    pub json: bool,
}

impl CliOptions {
    pub fn from_args() -> Self {
        Self::parse(env::args().skip(1))
    }

    pub fn parse(args: impl IntoIterator<Item = String>) -> Self {
        let mut options = CliOptions::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--apply" => options.apply = true,
                "--json" => options.json = true,
                "--database-url" => {
                    if let Some(value) = args.next() {
                        options.database_url = Some(value);
                    }
                }
                _ if arg.starts_with("--database-url=") => {
                    if let Some(value) = arg.split_once('=').map(|(_, v)| v) {
                        options.database_url = Some(value.to_string());
                    }
                }
                _ if arg.starts_with("--") => {}
                _ => options.schema_path = Some(arg),
            }
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> CliOptions {
        CliOptions::parse(args.iter().map(|a| a.to_string()))
    }

    #[test]
    fn test_parse_flags() {
        assert_eq!(
            parse(&["schema.yaml", "--apply", "--database-url", "sqlite://nest.db"]),
            CliOptions {
                schema_path: Some("schema.yaml".to_string()),
                apply: true,
                database_url: Some("sqlite://nest.db".to_string()),
                json: false,
            }
        );
    }

    #[test]
    fn test_parse_inline_value_and_unknown_flag() {
        let options = parse(&["--database-url=sqlite::memory:", "--verbose", "--json"]);
        assert_eq!(options.database_url.as_deref(), Some("sqlite::memory:"));
        assert!(options.json);
        assert_eq!(options.schema_path, None);
    }
}
