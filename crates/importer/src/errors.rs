//! Importer error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Cannot open {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("Malformed row in {source_name} (line {line}): {message}")]
    MalformedRow {
        source_name: String,
        line: u64,
        message: String,
    },

    #[error("{source_name} row {row_id}: {message}")]
    InvalidRow {
        source_name: String,
        row_id: i32,
        message: String,
    },

    #[error("{source_name} row {row_id}: {field} refers to missing {target} {target_id}")]
    MissingReference {
        source_name: String,
        row_id: i32,
        field: &'static str,
        target: &'static str,
        target_id: i32,
    },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<yamdb_common::errors::AppError> for ImportError {
    fn from(e: yamdb_common::errors::AppError) -> Self {
        match e {
            yamdb_common::errors::AppError::Database(db) => ImportError::Database(db),
            other => ImportError::Config(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;
