//! Error types for Umbra

use thiserror::Error;

/// The main error type for Umbra operations
#[derive(Debug, Error)]
pub enum UmbraError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),

    #[error("Scene error: {0}")]
    SceneError(String),

    #[error("Import error: {0}")]
    ImportError(String),

    #[error("Resource error: {0}")]
    ResourceError(String),

    #[error("Render error: {0}")]
    RenderError(String),
}

/// Result type alias for Umbra operations
pub type Result<T> = std::result::Result<T, UmbraError>;

impl From<toml::de::Error> for UmbraError {
    fn from(err: toml::de::Error) -> Self {
        UmbraError::TomlParseError(err.to_string())
    }
}
