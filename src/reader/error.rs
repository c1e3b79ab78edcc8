use thiserror::Error;

use crate::container::ContainerError;
use crate::signing::TrustError;

/// Errors raised while opening and validating a database.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error(transparent)]
    Trust(#[from] TrustError),
    /// The file's schema id did not match the caller's expected schema.
    #[error("schema mismatch: expected {expected}, found {found}")]
    SchemaMismatch { expected: u32, found: u32 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
