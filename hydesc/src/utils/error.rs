use thiserror::Error;

#[derive(Debug, Error)]
pub enum HyError {
    #[error("Type '{0}' is not known to the type registry")]
    InvalidType(String),

    #[error("Type name '{name}' is already registered by a different type")]
    DuplicatedType { name: String },

    #[error("Shared cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration file '{file}': {source}")]
    ConfigParseError {
        source: toml::de::Error,
        file: String,
    },

    #[error("An unknown error occurred: {0}")]
    Unknown(String),
}

pub type HyResult<T> = Result<T, HyError>;
