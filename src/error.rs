use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the clustering engine and its communication layer.
///
/// Configuration errors are raised by the root before the first collective is
/// started. Empty clusters and hitting the iteration cap are not errors; they
/// are reported through [`crate::FitReport`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// `k` must be at least 1.
    #[error("invalid cluster count: k = {0}")]
    InvalidClusterCount(usize),

    /// Elements must have at least one dimension.
    #[error("invalid element dimensionality: d = {0}")]
    InvalidDimensions(usize),

    /// Fewer elements than clusters, so `k` distinct seeds cannot be drawn.
    #[error("cannot seed {k} clusters from {n} elements")]
    InsufficientElements { n: usize, k: usize },

    /// A buffer does not have the length its declared shape implies.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// `fit` was called on a worker that is not the root.
    #[error("rank {rank} is not the root (root is {root})")]
    NotRoot { rank: usize, root: usize },

    /// `fit_work` was called on the root.
    #[error("rank {0} is the root and must call fit")]
    IsRoot(usize),

    /// A worker's engine parameters disagree with the ones announced by the root.
    #[error("rank {rank} disagrees with root on {what}: root {root_value}, local {local_value}")]
    ConfigMismatch {
        rank: usize,
        what: &'static str,
        root_value: usize,
        local_value: usize,
    },

    /// A peer left the group while this worker still expected a message from it.
    #[error("peer rank {rank} exited before completing the collective")]
    PeerExited { rank: usize },

    /// A receive exceeded the configured timeout.
    #[error("timed out waiting for rank {rank}")]
    Timeout { rank: usize },

    /// Unexpected message kind or payload.
    #[error("protocol violation: {0}")]
    Protocol(String),
}
