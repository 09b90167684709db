//! Error types for the math transform.

use thiserror::Error;

/// Result type alias for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Raised at setup, before any page is processed.
    #[error("Unsupported output format: {0}")]
    UnsupportedOutput(String),

    #[error("Invalid options: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid delimiter pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// The engine rejected an expression and `noerrors` is not enabled.
    #[error("Failed to typeset `{tex}`: {message}")]
    Typeset { tex: String, message: String },

    #[error("Math engine error: {0}")]
    Engine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
