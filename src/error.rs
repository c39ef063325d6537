//! Error taxonomy for the catalog pipeline and search engine.
//!
//! Variants map one-to-one onto the conditions callers need to tell apart:
//! bad input is rejected before any store access (`InvalidArgument`), a
//! missing source file aborts a load (`NotFound`), a store that has never
//! been initialized is distinguishable from a store that is broken
//! (`SchemaNotInitialized` vs `Database`), and embedding backend failures
//! carry their own variant so a half-indexed batch can be reported honestly.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("schema not initialized: {0}")]
    SchemaNotInitialized(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("embedding error: {0}")]
    Embedding(String),
}

impl CatalogError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }

    pub fn is_schema_missing(&self) -> bool {
        matches!(self, Self::SchemaNotInitialized(_))
    }

    pub fn is_database(&self) -> bool {
        matches!(self, Self::Database(_))
    }

    /// The driver message for database failures, when one exists.
    ///
    /// SQLite driver messages never embed credentials, so this is safe to
    /// surface as a response `detail`.
    pub fn database_detail(&self) -> Option<String> {
        match self {
            Self::Database(sqlx::Error::Database(db)) => Some(db.message().to_string()),
            _ => None,
        }
    }
}

/// Classify store failures: querying a table that was never created means
/// the schema manager has not run, which callers surface as a setup problem
/// rather than a generic database fault.
impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db) = err {
            if db.message().contains("no such table") {
                return Self::SchemaNotInitialized(db.message().to_string());
            }
        }
        Self::Database(err)
    }
}
