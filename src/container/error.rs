use thiserror::Error;

/// Errors raised by the block codec and container reader/writer.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Structural corruption: misaligned block, truncation, unexpected
    /// block order, header/magic mismatch, or a reserved block type.
    #[error("malformed container: {0}")]
    BadMessage(String),
    /// The file header's magic or schema id did not match what was expected.
    #[error("bad format: {0}")]
    BadFormat(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ContainerError {
    pub(crate) fn bad_message(reason: impl Into<String>) -> Self {
        ContainerError::BadMessage(reason.into())
    }
}
