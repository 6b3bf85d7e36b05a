//! Error types for the chunked-array runtime.

use thiserror::Error;

/// Result type for graph-building operations.
pub type Result<T> = std::result::Result<T, ArrayError>;

/// Errors raised while building computation graphs.
///
/// Evaluation itself never fails: kernels are pure functions over chunks
/// whose alignment was checked at build time.
#[derive(Debug, Error)]
pub enum ArrayError {
    /// Two arrays that must align elementwise have different lengths.
    #[error("array length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Two arrays that must align chunkwise have different chunk layouts.
    #[error("chunk layout mismatch: {left:?} vs {right:?}")]
    ChunkMismatch {
        left: Vec<usize>,
        right: Vec<usize>,
    },
}
