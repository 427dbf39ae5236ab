//! Error type shared by schema configuration and the relationship runtime.

use thiserror::Error;

use crate::nest::InstanceId;
use crate::orm::EntityId;

pub type Result<T> = std::result::Result<T, NestError>;

#[derive(Debug, Error)]
pub enum NestError {
    /// A required behavior parameter was not supplied.
    #[error("behavior `{behavior}` requires the `{parameter}` parameter")]
    MissingParameter {
        behavior: &'static str,
        parameter: &'static str,
    },
    /// The schema cannot carry the behavior (e.g. composite parent key).
    #[error("unsupported schema: {0}")]
    UnsupportedSchema(String),
    #[error("table `{0}` is not defined in the schema")]
    UnknownTable(String),
    #[error("invalid schema document: {0}")]
    InvalidSchema(String),
    /// The unordered pair is already stored. Callers adding relations treat
    /// this as success.
    #[error("association {{{first}, {second}}} already exists")]
    DuplicateAssociation { first: EntityId, second: EntityId },
    /// A pending pair could not be flushed because an endpoint has no id.
    #[error("cannot flush pending relation: {0}")]
    UnresolvedIdentity(String),
    #[error("{0} is not held by this manager")]
    UnknownInstance(InstanceId),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<serde_yaml::Error> for NestError {
    fn from(err: serde_yaml::Error) -> Self {
        NestError::InvalidSchema(err.to_string())
    }
}

impl NestError {
    /// True for errors raised while processing a schema, before any DDL or
    /// runtime object exists.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            NestError::MissingParameter { .. }
                | NestError::UnsupportedSchema(_)
                | NestError::UnknownTable(_)
                | NestError::InvalidSchema(_)
        )
    }
}
