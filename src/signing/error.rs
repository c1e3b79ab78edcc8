use thiserror::Error;

/// Errors raised while signing or verifying a content slab.
#[derive(Debug, Error)]
pub enum TrustError {
    /// No signature blocks were present to check against a trusted key.
    #[error("no signature present")]
    NoKey,
    /// At least one signature block was present, but none verified against
    /// a trusted key.
    #[error("no signature verified against a trusted key")]
    KeyRejected,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
