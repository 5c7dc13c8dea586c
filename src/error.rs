//! Error types for the landing page renderer, server and headless check

use thiserror::Error;

/// Result type alias for crate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while rendering, serving or checking the page
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to render the page template
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Failed to load a URL or document
    #[error("Failed to load URL: {0}")]
    LoadError(String),

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Operation timed out
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Invalid configuration (including malformed check scripts)
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// The page server could not bind or respond
    #[error("Server error: {0}")]
    ServeError(String),

    /// A click or navigation could not be performed
    #[error("Navigation failed: {0}")]
    NavigationError(String),
}

impl From<askama::Error> for Error {
    fn from(err: askama::Error) -> Self {
        Error::RenderError(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::NavigationError(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::NetworkError(err.to_string())
    }
}
