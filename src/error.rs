//! Error types for the verification harness

use thiserror::Error;

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving a rendering surface or running a check
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to initialize a rendering surface
    #[error("Surface initialization failed: {0}")]
    InitializationError(String),

    /// Failed to load the target page
    #[error("Failed to load URL: {0}")]
    LoadError(String),

    /// The page did not reach the required readiness state in time.
    /// Infrastructure failure, distinct from a content mismatch.
    #[error("Readiness not reached within {0}ms")]
    Timeout(u64),

    /// Failed to extract a fact from the rendered page
    #[error("Extraction failed: {0}")]
    ExtractionError(String),

    /// Failed to capture a screenshot
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Baseline store I/O failed
    #[error("Baseline store error: {0}")]
    BaselineError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Network error while fetching the page or probing a link
    #[error("Network error: {0}")]
    NetworkError(String),

    /// CDP-specific error
    #[cfg(feature = "cdp")]
    #[error("CDP error: {0}")]
    CdpError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::BaselineError(err.to_string())
    }
}

#[cfg(feature = "cdp")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::CdpError(err.to_string())
    }
}
