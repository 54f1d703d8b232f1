use thiserror::Error;

/// Errors raised while loading or compiling the stat catalog. These are
/// fatal: a catalog that fails to build must abort the run before any
/// modifier is processed.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("malformed template for stat '{stat_key}': {reason}")]
    MalformedTemplate { stat_key: String, reason: String },

    #[error("unknown category '{category}' for stat '{stat_key}'")]
    UnknownCategory { stat_key: String, category: String },

    #[error("template regex for stat '{stat_key}' failed to compile: {source}")]
    Regex {
        stat_key: String,
        #[source]
        source: regex::Error,
    },
}

/// Errors raised while adapting a source row into a raw modifier.
/// These are per-record: the row is skipped and counted, never fatal.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("source row is missing its source key")]
    MissingSourceKey,

    #[error("unknown source table '{0}'")]
    UnknownSourceTable(String),
}

/// Errors raised while extracting numeric values from a template match.
/// These disqualify a single candidate, not the whole modifier.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("captured value '{0}' is not a number")]
    BadNumber(String),

    #[error("captured value {0} exceeds the magnitude limit")]
    NumericOverflow(f64),
}

/// Errors raised while persisting resolved records.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("write retries exhausted after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

#[derive(Error, Debug)]
pub enum WraeclastError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("Write error: {0}")]
    Write(#[from] WriteError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, WraeclastError>;
