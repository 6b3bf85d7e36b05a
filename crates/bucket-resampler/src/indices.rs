//! Bucket index computation.

use chunked_array::LazyArray;
use swath_common::GridDefinition;

use crate::error::{ResampleError, Result};
use crate::projector::project_coordinates;

/// Row/column bucket indices for one (coordinates, grid) pairing.
///
/// Samples falling outside the grid, or carrying non-finite coordinates,
/// hold the sentinel `n_rows * n_cols` in BOTH indices; the aggregators
/// route them into a dedicated overflow bin and drop them. All arrays are
/// lazy; constructing this never forces evaluation.
#[derive(Debug, Clone)]
pub struct BucketIndices {
    y_idxs: LazyArray<i64>,
    x_idxs: LazyArray<i64>,
    linear: LazyArray<i64>,
    shape: (usize, usize),
}

impl BucketIndices {
    /// Assemble from precomputed row (`y_idxs`) and column (`x_idxs`)
    /// indices.
    ///
    /// Out-of-range entries are tolerated: linearization clamps anything
    /// outside the grid into the overflow bin.
    pub fn from_parts(
        y_idxs: LazyArray<i64>,
        x_idxs: LazyArray<i64>,
        shape: (usize, usize),
    ) -> Result<Self> {
        if y_idxs.len() != x_idxs.len() {
            return Err(ResampleError::IndexLengthMismatch {
                rows: y_idxs.len(),
                cols: x_idxs.len(),
            });
        }
        let linear = linear_ids(&y_idxs, &x_idxs, shape)?;
        Ok(Self {
            y_idxs,
            x_idxs,
            linear,
            shape,
        })
    }

    /// Row indices, one per sample.
    pub fn y_idxs(&self) -> &LazyArray<i64> {
        &self.y_idxs
    }

    /// Column indices, one per sample.
    pub fn x_idxs(&self) -> &LazyArray<i64> {
        &self.x_idxs
    }

    /// The grid shape these indices were computed for.
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.y_idxs.len()
    }

    /// Check if there are no samples.
    pub fn is_empty(&self) -> bool {
        self.y_idxs.is_empty()
    }

    /// The sentinel value marking discarded samples.
    pub fn sentinel(&self) -> i64 {
        (self.shape.0 * self.shape.1) as i64
    }

    /// Flattened bucket ids shared by every aggregation over these
    /// indices.
    pub(crate) fn linear(&self) -> &LazyArray<i64> {
        &self.linear
    }
}

/// Flattened bucket ids: `row * n_cols + col`, with anything outside the
/// grid clamped to the overflow bin `n_rows * n_cols`.
fn linear_ids(
    y_idxs: &LazyArray<i64>,
    x_idxs: &LazyArray<i64>,
    shape: (usize, usize),
) -> Result<LazyArray<i64>> {
    let rows = shape.0 as i64;
    let cols = shape.1 as i64;
    let overflow = rows * cols;
    let linear = y_idxs.zip_map(x_idxs, move |row, col| {
        if row < 0 || col < 0 || row >= rows || col >= cols {
            overflow
        } else {
            row * cols + col
        }
    })?;
    Ok(linear)
}

/// Maps rounded projected coordinates to grid cells.
#[derive(Clone, Copy)]
struct CellMapper {
    min_x: f64,
    max_y: f64,
    x_res: f64,
    y_res: f64,
    rows: i64,
    cols: i64,
    sentinel: i64,
}

impl CellMapper {
    fn cell(&self, x: f64, y: f64) -> Option<(i64, i64)> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let col = ((x - self.min_x) / self.x_res).floor();
        let row = ((self.max_y - y) / self.y_res).floor();
        if !col.is_finite() || !row.is_finite() {
            return None;
        }
        let (col, row) = (col as i64, row as i64);
        if row < 0 || row >= self.rows || col < 0 || col >= self.cols {
            return None;
        }
        Some((row, col))
    }

    fn row(&self, x: f64, y: f64) -> i64 {
        self.cell(x, y).map_or(self.sentinel, |(row, _)| row)
    }

    fn col(&self, x: f64, y: f64) -> i64 {
        self.cell(x, y).map_or(self.sentinel, |(_, col)| col)
    }
}

/// Compute bucket indices for the given samples on `grid`.
///
/// Column indices count from the left edge of the extent; row indices
/// count from the TOP (`max_y`), so row 0 is the northernmost row of the
/// accumulator grids. The result is lazy; nothing is projected until an
/// aggregation built on it is materialized.
///
/// A grid whose extent or shape yields a non-positive resolution is an
/// input-contract violation: the resulting non-finite arithmetic funnels
/// every sample into the sentinel rather than raising an error here.
pub fn bucket_indices(
    grid: &GridDefinition,
    lons: &LazyArray<f64>,
    lats: &LazyArray<f64>,
) -> Result<BucketIndices> {
    let (n_rows, n_cols) = grid.shape();
    let (x_res, y_res) = grid.resolution();
    let extent = grid.extent();

    let coords = project_coordinates(lons, lats, x_res, y_res, grid.projection())?;

    let mapper = CellMapper {
        min_x: extent.min_x,
        max_y: extent.max_y,
        x_res,
        y_res,
        rows: n_rows as i64,
        cols: n_cols as i64,
        sentinel: (n_rows * n_cols) as i64,
    };
    let y_idxs = coords.y().zip_map(coords.x(), move |y, x| mapper.row(x, y))?;
    let x_idxs = coords.x().zip_map(coords.y(), move |x, y| mapper.col(x, y))?;

    BucketIndices::from_parts(y_idxs, x_idxs, (n_rows, n_cols))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_ids_clamp_to_overflow() {
        let y = LazyArray::from_vec(vec![0_i64, 1, 2, -1, 6, 0]);
        let x = LazyArray::from_vec(vec![0_i64, 2, 1, 0, 6, 3]);
        let idxs = BucketIndices::from_parts(y, x, (2, 3)).expect("same length");
        // Rows 2, -1 and 6 are outside a 2x3 grid; col 3 is too.
        assert_eq!(idxs.linear().compute(), vec![0, 5, 6, 6, 6, 6]);
        assert_eq!(idxs.sentinel(), 6);
    }

    #[test]
    fn test_from_parts_length_mismatch() {
        let y = LazyArray::from_vec(vec![0_i64, 1]);
        let x = LazyArray::from_vec(vec![0_i64]);
        assert!(matches!(
            BucketIndices::from_parts(y, x, (2, 2)),
            Err(ResampleError::IndexLengthMismatch { rows: 2, cols: 1 })
        ));
    }
}
