//! Aggregation facades orchestrating index reuse.

use chunked_array::LazyArray;
use swath_common::GridDefinition;

use crate::aggregate::{scatter_count, scatter_sum, LazyGrid};
use crate::cache::{CacheStats, IndexCache, IndexKey};
use crate::error::Result;
use crate::indices::{bucket_indices, BucketIndices};

/// A resampling session owning the bucket index cache.
///
/// Aggregations against the same lon/lat arrays and grid reuse one set of
/// bucket indices, keyed by identity; the projection work behind them
/// runs at most once even across separate `sum`/`count`/`average` calls.
/// Every result stays lazy until the caller materializes it.
#[derive(Default)]
pub struct BucketSession {
    cache: IndexCache,
}

impl BucketSession {
    /// Create a session with an empty index cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket indices for `grid`, computed once per distinct
    /// (lon, lat, grid) identity and cached for the session lifetime.
    pub fn indices(
        &self,
        grid: &GridDefinition,
        lons: &LazyArray<f64>,
        lats: &LazyArray<f64>,
    ) -> Result<BucketIndices> {
        let key: IndexKey = (lons.token(), lats.token(), grid.id());
        self.cache
            .get_or_insert_with(key, || bucket_indices(grid, lons, lats))
    }

    /// Per-cell sum of `data` over the grid.
    ///
    /// `data` may be a plain lazy array or a labeled wrapper; labels are
    /// discarded before aggregation.
    pub fn sum(
        &self,
        grid: &GridDefinition,
        data: impl Into<LazyArray<f64>>,
        lons: &LazyArray<f64>,
        lats: &LazyArray<f64>,
    ) -> Result<LazyGrid<f64>> {
        let indices = self.indices(grid, lons, lats)?;
        scatter_sum(&data.into(), &indices, grid.shape())
    }

    /// Per-cell sum using precomputed indices.
    pub fn sum_with_indices(
        &self,
        grid: &GridDefinition,
        data: impl Into<LazyArray<f64>>,
        indices: &BucketIndices,
    ) -> Result<LazyGrid<f64>> {
        scatter_sum(&data.into(), indices, grid.shape())
    }

    /// Per-cell sample count over the grid.
    pub fn count(
        &self,
        grid: &GridDefinition,
        lons: &LazyArray<f64>,
        lats: &LazyArray<f64>,
    ) -> Result<LazyGrid<u64>> {
        let indices = self.indices(grid, lons, lats)?;
        scatter_count(&indices, grid.shape())
    }

    /// Per-cell sample count using precomputed indices.
    pub fn count_with_indices(
        &self,
        grid: &GridDefinition,
        indices: &BucketIndices,
    ) -> Result<LazyGrid<u64>> {
        scatter_count(indices, grid.shape())
    }

    /// Per-cell average of `data` over the grid.
    ///
    /// Cells with no samples get `fill_value` instead of a division
    /// artifact; pass `f64::NAN` for the conventional missing marker.
    pub fn average(
        &self,
        grid: &GridDefinition,
        data: impl Into<LazyArray<f64>>,
        lons: &LazyArray<f64>,
        lats: &LazyArray<f64>,
        fill_value: f64,
    ) -> Result<LazyGrid<f64>> {
        let indices = self.indices(grid, lons, lats)?;
        self.average_with_indices(grid, data, &indices, fill_value)
    }

    /// Per-cell average using precomputed indices.
    ///
    /// Sum and count share the indices' flattened-bucket computation, so
    /// the samples are routed once for both statistics.
    pub fn average_with_indices(
        &self,
        grid: &GridDefinition,
        data: impl Into<LazyArray<f64>>,
        indices: &BucketIndices,
        fill_value: f64,
    ) -> Result<LazyGrid<f64>> {
        let sums = scatter_sum(&data.into(), indices, grid.shape())?;
        let counts = scatter_count(indices, grid.shape())?;
        let averaged = sums.values().zip_map(
            &counts.values().cast::<f64>(),
            move |sum, count| {
                if count == 0.0 {
                    fill_value
                } else {
                    sum / count
                }
            },
        )?;
        Ok(LazyGrid::new(averaged, grid.shape()))
    }

    /// Index-cache statistics for this session.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
