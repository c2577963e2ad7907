//! Error types for robolog.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RobologError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("checklist error: {0}")]
    Checklist(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
