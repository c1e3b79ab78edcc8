//! Crate-wide error taxonomy. Every public entry point returns [`Error`];
//! the per-layer error enums (`ContainerError`, `SchemaError`, `TrustError`,
//! `StreamError`) still exist for callers that only touch one layer and
//! convert into this one with `?`.

use thiserror::Error;

use crate::container::ContainerError;
use crate::reader::ReaderError;
use crate::schema::SchemaError;
use crate::signing::TrustError;
use crate::stream_reader::StreamError;

/// The seven domain error kinds named in the format's error model.
#[derive(Debug, Error)]
pub enum Error {
    /// Structural corruption: truncation, bad block order, bad magic,
    /// reserved tag or block type.
    #[error("bad message: {0}")]
    BadMessage(String),
    /// A schema mismatch, a builder misuse against its own schema, or a
    /// malformed value tree.
    #[error("bad format: {0}")]
    BadFormat(String),
    /// No signature was present where one was required.
    #[error("no key")]
    NoKey,
    /// A signature was present but did not verify against a trusted key.
    #[error("key rejected")]
    KeyRejected,
    /// A declared but unimplemented value tag (`INT_64`, `BLOB_32`) was
    /// encountered where a concrete value was required.
    #[error("unsupported value tag")]
    Unsupported,
    /// A builder's capacity, or the 512-entry cross-database copy limit,
    /// was exceeded.
    #[error("too big: {0}")]
    TooBig(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<ContainerError> for Error {
    fn from(e: ContainerError) -> Self {
        match e {
            ContainerError::BadMessage(msg) => Error::BadMessage(msg),
            ContainerError::BadFormat(msg) => Error::BadFormat(msg),
            ContainerError::Io(e) => Error::Io(e),
        }
    }
}

impl From<SchemaError> for Error {
    fn from(e: SchemaError) -> Self {
        match e {
            SchemaError::BadFormat(msg) => Error::BadFormat(msg),
            SchemaError::TooBig(msg) => Error::TooBig(msg),
            SchemaError::Unsupported => Error::Unsupported,
        }
    }
}

impl From<TrustError> for Error {
    fn from(e: TrustError) -> Self {
        match e {
            TrustError::NoKey => Error::NoKey,
            TrustError::KeyRejected => Error::KeyRejected,
            TrustError::Io(e) => Error::Io(e),
        }
    }
}

impl From<ReaderError> for Error {
    fn from(e: ReaderError) -> Self {
        match e {
            ReaderError::Container(e) => e.into(),
            ReaderError::Trust(e) => e.into(),
            ReaderError::SchemaMismatch { expected, found } => {
                Error::BadFormat(format!("schema mismatch: expected {expected}, found {found}"))
            }
            ReaderError::Io(e) => Error::Io(e),
        }
    }
}

impl From<StreamError> for Error {
    fn from(e: StreamError) -> Self {
        match e {
            StreamError::BadMessage(msg) => Error::BadMessage(msg),
            StreamError::Container(e) => e.into(),
            StreamError::Trust(e) => e.into(),
            StreamError::Io(e) => Error::Io(e),
        }
    }
}
