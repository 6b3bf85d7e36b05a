//! Error types for bucket resampling.

use thiserror::Error;

/// Result type for resampling operations.
pub type Result<T> = std::result::Result<T, ResampleError>;

/// Errors that can occur while assembling a resampling graph.
///
/// All of these are input-contract violations surfaced at graph-build
/// time; evaluation itself never fails. Numerical edge cases (NaN
/// coordinates, out-of-grid samples, empty cells) resolve to defined
/// values instead of errors.
#[derive(Debug, Error)]
pub enum ResampleError {
    /// Data array and bucket indices disagree on sample count.
    #[error("data length {data_len} does not match {index_len} bucket indices")]
    ShapeMismatch { data_len: usize, index_len: usize },

    /// Row and column index arrays disagree on sample count.
    #[error("row/column index arrays have different lengths: {rows} vs {cols}")]
    IndexLengthMismatch { rows: usize, cols: usize },

    /// Indices were computed against a different grid shape.
    #[error("bucket indices were built for grid shape {built:?}, not {requested:?}")]
    GridShapeMismatch {
        built: (usize, usize),
        requested: (usize, usize),
    },

    /// Underlying array layout error.
    #[error(transparent)]
    Array(#[from] chunked_array::ArrayError),
}
