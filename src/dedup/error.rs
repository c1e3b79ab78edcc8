use thiserror::Error;

#[derive(Debug, Error)]
pub enum DedupError {
    /// The writer's fixed-size scratch buffer has no room left.
    #[error("writer capacity exceeded")]
    TooBig,
    /// A write was attempted on a writer whose magic has been cleared after
    /// an earlier error.
    #[error("writer is poisoned by an earlier error")]
    Poisoned,
}
