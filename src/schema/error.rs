use thiserror::Error;

use crate::dedup::DedupError;

/// Errors raised by the schema engine: building, comparing, and
/// cross-database copying of objects and arrays.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Wrong schema id, a required field missing, or a type-tag mismatch
    /// encountered while copying between databases.
    #[error("bad format: {0}")]
    BadFormat(String),
    /// A builder's declared capacity was exceeded, or a single object
    /// exceeded 512 entries during cross-database copy.
    #[error("too big: {0}")]
    TooBig(String),
    /// `INT_64` or `BLOB_32` encountered during cross-database copy; the
    /// format declares these tags but the v1 engine never writes them.
    #[error("unsupported value tag")]
    Unsupported,
}

impl SchemaError {
    pub(crate) fn bad_format(reason: impl Into<String>) -> Self {
        SchemaError::BadFormat(reason.into())
    }
}

impl From<DedupError> for SchemaError {
    fn from(e: DedupError) -> Self {
        match e {
            DedupError::TooBig => SchemaError::TooBig("writer capacity exceeded".into()),
            DedupError::Poisoned => SchemaError::BadFormat("writer is poisoned by an earlier error".into()),
        }
    }
}
