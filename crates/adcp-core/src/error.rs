use thiserror::Error;

/// Errors raised while loading shared configuration and lookup tables.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    #[error("Invalid direction: {0} (expected 'from' or 'to')")]
    InvalidDirection(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
