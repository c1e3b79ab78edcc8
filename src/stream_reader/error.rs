use thiserror::Error;

use crate::container::ContainerError;
use crate::signing::TrustError;

/// Errors raised while reading a container incrementally from a
/// non-seekable stream.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("malformed stream: {0}")]
    BadMessage(String),
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error(transparent)]
    Trust(#[from] TrustError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StreamError {
    pub(crate) fn bad_message(reason: impl Into<String>) -> Self {
        StreamError::BadMessage(reason.into())
    }
}
