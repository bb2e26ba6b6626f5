//! Error taxonomy shared by every package variant and manifest dialect.
use thiserror::Error;

/// Main error type for pubpack operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Stream open, read, write or close failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest file or container entry absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Manifest undecodable, charset unresolved, or container structure invalid
    #[error("Format error: {0}")]
    FormatError(String),

    /// Operation invoked out of sequence (e.g. marking a path that was never written)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration could not be loaded or parsed
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for pubpack operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this error means something the caller asked for does not exist.
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
