use thiserror::Error;

/// Result alias used throughout the domain layer.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for domain operations.
///
/// Validation and not-found errors are surfaced to the caller with a
/// descriptive message. Conversion errors abort the transaction-creation
/// flow entirely. Storage errors wrap whatever the repository layer
/// reported.
#[derive(Error, Debug)]
pub enum Error {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("currency conversion failed: {0}")]
    Conversion(String),

    #[error("access denied: {0}")]
    Authorization(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}
