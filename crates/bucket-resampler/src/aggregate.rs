//! Scatter aggregation of samples into grid-shaped accumulators.
//!
//! Each chunk of linear bucket ids produces a flat histogram sized
//! `n_rows * n_cols + 1`: one slot per cell plus a trailing overflow bin
//! collecting discarded samples. Per-chunk partials merge by elementwise
//! addition, which is associative and commutative, so chunk evaluation
//! order never changes the result. The overflow bin is sliced off at the
//! end.

use std::ops::AddAssign;

use chunked_array::{Element, LazyArray};
use num_traits::Zero;

use crate::error::{ResampleError, Result};
use crate::indices::BucketIndices;

/// A grid-shaped aggregation result that has not been evaluated yet.
#[derive(Debug, Clone)]
pub struct LazyGrid<T: Element> {
    values: LazyArray<T>,
    shape: (usize, usize),
}

impl<T: Element> LazyGrid<T> {
    pub(crate) fn new(values: LazyArray<T>, shape: (usize, usize)) -> Self {
        Self { values, shape }
    }

    /// Grid dimensions as (rows, columns).
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// The underlying lazy values in row-major order.
    pub fn values(&self) -> &LazyArray<T> {
        &self.values
    }

    /// Materialize into a concrete grid.
    pub fn compute(&self) -> GridData<T> {
        GridData {
            values: self.values.compute(),
            shape: self.shape,
        }
    }
}

/// A materialized accumulator grid in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct GridData<T> {
    values: Vec<T>,
    shape: (usize, usize),
}

impl<T: Copy> GridData<T> {
    /// Grid dimensions as (rows, columns).
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// The raw row-major values.
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Consume into the raw row-major values.
    pub fn into_values(self) -> Vec<T> {
        self.values
    }

    /// Get the value at a grid position.
    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        let (n_rows, n_cols) = self.shape;
        if row >= n_rows || col >= n_cols {
            return None;
        }
        self.values.get(row * n_cols + col).copied()
    }

    /// Iterate over all cell values.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.values.iter().copied()
    }
}

/// Per-cell sums of `data` over the buckets described by `indices`.
///
/// `data` must align 1:1 with the samples behind `indices`; arrays of the
/// right length but a different chunk layout are re-partitioned lazily.
/// NaN data values contribute zero weight while their sample still
/// occupies the bucket for counting purposes.
pub fn scatter_sum(
    data: &LazyArray<f64>,
    indices: &BucketIndices,
    shape: (usize, usize),
) -> Result<LazyGrid<f64>> {
    check_shape(indices, shape)?;
    let data = align_data(data, indices)?;
    let n_bins = shape.0 * shape.1 + 1;

    let partial_lens = vec![n_bins; indices.linear().chunk_lens().len()];
    let partials =
        indices
            .linear()
            .zip_map_chunks(&data, partial_lens, move |ids, weights| {
                let mut bins = vec![0.0_f64; n_bins];
                for (id, weight) in ids.iter().zip(weights.iter()) {
                    let weight = if weight.is_nan() { 0.0 } else { *weight };
                    // Linear ids are clamped into 0..n_bins at construction.
                    bins[*id as usize] += weight;
                }
                bins
            })?;

    Ok(LazyGrid::new(merge_partials(&partials, n_bins), shape))
}

/// Per-cell sample counts over the buckets described by `indices`.
pub fn scatter_count(indices: &BucketIndices, shape: (usize, usize)) -> Result<LazyGrid<u64>> {
    check_shape(indices, shape)?;
    let n_bins = shape.0 * shape.1 + 1;

    let partial_lens = vec![n_bins; indices.linear().chunk_lens().len()];
    let partials = indices.linear().map_chunks(partial_lens, move |ids| {
        let mut bins = vec![0_u64; n_bins];
        for id in ids {
            bins[*id as usize] += 1;
        }
        bins
    });

    Ok(LazyGrid::new(merge_partials(&partials, n_bins), shape))
}

fn check_shape(indices: &BucketIndices, shape: (usize, usize)) -> Result<()> {
    if indices.shape() != shape {
        return Err(ResampleError::GridShapeMismatch {
            built: indices.shape(),
            requested: shape,
        });
    }
    Ok(())
}

fn align_data(data: &LazyArray<f64>, indices: &BucketIndices) -> Result<LazyArray<f64>> {
    if data.len() != indices.len() {
        return Err(ResampleError::ShapeMismatch {
            data_len: data.len(),
            index_len: indices.len(),
        });
    }
    if data.chunk_lens() == indices.linear().chunk_lens() {
        Ok(data.clone())
    } else {
        Ok(data.rechunk(indices.linear().chunk_lens().to_vec())?)
    }
}

/// Merge per-chunk histograms elementwise and slice off the overflow bin.
fn merge_partials<T>(partials: &LazyArray<T>, n_bins: usize) -> LazyArray<T>
where
    T: Element + AddAssign + Zero,
{
    partials.reduce_chunks(n_bins - 1, move |chunks| {
        let mut merged = vec![T::zero(); n_bins];
        for chunk in chunks {
            for (slot, value) in merged.iter_mut().zip(chunk.iter()) {
                *slot += *value;
            }
        }
        merged.truncate(n_bins - 1);
        merged
    })
}
