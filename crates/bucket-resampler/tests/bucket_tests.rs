//! End-to-end tests for bucket resampling over lazy chunked arrays.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bucket_resampler::{round_to_resolution, BucketSession};
use chunked_array::{with_scheduler, CountingScheduler, LabeledArray, LazyArray};
use projection::{Equirectangular, PolarStereographic};
use swath_common::{Extent, GridDefinition, Projection};
use test_utils::{constant_data, ramp_data, swath_track};

/// A 4x4 grid over projected coordinates (0, 0)..(4, 4) where projection
/// is the identity, so every index is predictable by hand.
fn identity_grid() -> GridDefinition {
    GridDefinition::new(
        4,
        4,
        Extent::new(0.0, 0.0, 4.0, 4.0),
        Arc::new(Equirectangular::identity()),
    )
}

/// Six samples on the identity grid: four valid (all in distinct cells),
/// one with a NaN coordinate, one projecting outside the extent.
fn mixed_samples() -> (LazyArray<f64>, LazyArray<f64>) {
    let lons = LazyArray::from_vec_chunked(vec![0.2, 1.2, 2.6, f64::NAN, 10.0, -0.4], 2);
    let lats = LazyArray::from_vec_chunked(vec![3.8, 2.7, 1.4, 2.0, 2.0, 2.2], 2);
    (lons, lats)
}

/// The swath from the reference scenario: four samples at lon 25 walking
/// north from 60.0 to 60.3 degrees, on a 3 km polar stereographic grid
/// (true scale at 60 N, central meridian 0) that encloses them.
fn polar_scenario() -> (GridDefinition, LazyArray<f64>, LazyArray<f64>) {
    let grid = GridDefinition::new(
        20,
        20,
        Extent::new(1_300_000.0, -2_900_000.0, 1_360_000.0, -2_840_000.0),
        Arc::new(PolarStereographic::north(0.0, 60.0)),
    );
    let (lons, lats) = swath_track(4, 25.0, 60.0, 0.0, 0.1);
    (
        grid,
        LazyArray::from_vec_chunked(lons, 2),
        LazyArray::from_vec_chunked(lats, 2),
    )
}

// ============================================================================
// round_to_resolution reference values
// ============================================================================

#[test]
fn test_round_to_resolution_reference_values() {
    // Scalar, integer resolution
    assert_eq!(round_to_resolution(5.5, 2.0), 6.0);
    // Scalar, non-integer resolution
    assert_eq!(round_to_resolution(5.5, 1.7), 5.1);
    // Slice
    assert_eq!(round_to_resolution(&[4.2, 5.6][..], 2.0), vec![4.0, 6.0]);
    // Owned vector
    assert_eq!(round_to_resolution(vec![4.2, 5.6], 2.0), vec![4.0, 6.0]);
    // Lazy array, and the rounding itself must not force evaluation
    let arr = LazyArray::from_vec(vec![4.2, 5.6]);
    let rounded = with_scheduler(Arc::new(CountingScheduler::new(0)), || {
        round_to_resolution(&arr, 2.0)
    });
    assert_eq!(rounded.compute(), vec![4.0, 6.0]);
}

// ============================================================================
// Bucket index invariants
// ============================================================================

#[test]
fn test_index_lengths_match_sample_count() {
    let session = BucketSession::new();
    let (lons, lats) = mixed_samples();
    let indices = session.indices(&identity_grid(), &lons, &lats).unwrap();
    assert_eq!(indices.y_idxs().len(), 6);
    assert_eq!(indices.x_idxs().len(), 6);
    assert_eq!(indices.len(), lons.len());
}

#[test]
fn test_exact_indices_on_identity_grid() {
    let session = BucketSession::new();
    let (lons, lats) = mixed_samples();
    let indices = session.indices(&identity_grid(), &lons, &lats).unwrap();
    let sentinel = indices.sentinel();
    assert_eq!(sentinel, 16);

    // Row 0 is the top of the grid: the northernmost sample (lat 3.8,
    // rounded to the max_y edge) gets row 0.
    let y_idxs = indices.y_idxs().compute();
    let x_idxs = indices.x_idxs().compute();
    assert_eq!(y_idxs, vec![0, 1, 3, sentinel, sentinel, 2]);
    assert_eq!(x_idxs, vec![0, 1, 3, sentinel, sentinel, 0]);
}

#[test]
fn test_discarded_samples_get_sentinel_in_both_coordinates() {
    let session = BucketSession::new();
    let (lons, lats) = mixed_samples();
    let indices = session.indices(&identity_grid(), &lons, &lats).unwrap();
    let sentinel = indices.sentinel();
    let (n_rows, n_cols) = indices.shape();

    let y_idxs = indices.y_idxs().compute();
    let x_idxs = indices.x_idxs().compute();
    for (row, col) in y_idxs.iter().zip(x_idxs.iter()) {
        let row_valid = (0..n_rows as i64).contains(row);
        let col_valid = (0..n_cols as i64).contains(col);
        // Either both indices are in range, or both hold the sentinel.
        assert!(
            (row_valid && col_valid) || (*row == sentinel && *col == sentinel),
            "inconsistent index pair ({}, {})",
            row,
            col
        );
    }
    assert_eq!(y_idxs.iter().filter(|v| **v == sentinel).count(), 2);
}

#[test]
fn test_index_computation_stays_lazy() {
    let session = BucketSession::new();
    let (lons, lats) = mixed_samples();
    with_scheduler(Arc::new(CountingScheduler::new(0)), || {
        session.indices(&identity_grid(), &lons, &lats).unwrap();
    });
}

// ============================================================================
// count
// ============================================================================

#[test]
fn test_count_tallies_distinct_cells() {
    let session = BucketSession::new();
    let (lons, lats) = mixed_samples();
    let counts = session.count(&identity_grid(), &lons, &lats).unwrap().compute();

    assert_eq!(counts.shape(), (4, 4));
    assert_eq!(counts.get(0, 0), Some(1));
    assert_eq!(counts.get(1, 1), Some(1));
    assert_eq!(counts.get(3, 3), Some(1));
    assert_eq!(counts.get(2, 0), Some(1));
    assert_eq!(counts.iter().max(), Some(1));
}

#[test]
fn test_count_conservation_with_discards() {
    let session = BucketSession::new();
    let (lons, lats) = mixed_samples();
    let counts = session.count(&identity_grid(), &lons, &lats).unwrap().compute();
    // Six samples, two discarded: the grid total must miss exactly those.
    assert_eq!(counts.iter().sum::<u64>(), 4);
}

#[test]
fn test_count_conservation_equality_when_all_valid() {
    let session = BucketSession::new();
    let lons = LazyArray::from_vec_chunked(vec![0.2, 1.2, 2.6, 1.8], 3);
    let lats = LazyArray::from_vec_chunked(vec![3.8, 2.7, 1.4, 0.8], 3);
    let counts = session.count(&identity_grid(), &lons, &lats).unwrap().compute();
    assert_eq!(counts.iter().sum::<u64>(), 4);
}

#[test]
fn test_count_multiple_samples_share_a_cell() {
    let session = BucketSession::new();
    let lons = LazyArray::from_vec(vec![0.2, 0.3]);
    let lats = LazyArray::from_vec(vec![3.8, 3.9]);
    let counts = session.count(&identity_grid(), &lons, &lats).unwrap().compute();
    assert_eq!(counts.get(0, 0), Some(2));
    assert_eq!(counts.iter().sum::<u64>(), 2);
}

#[test]
fn test_count_empty_swath() {
    let session = BucketSession::new();
    let lons = LazyArray::from_vec(Vec::new());
    let lats = LazyArray::from_vec(Vec::new());
    let counts = session.count(&identity_grid(), &lons, &lats).unwrap().compute();
    assert_eq!(counts.shape(), (4, 4));
    assert_eq!(counts.iter().sum::<u64>(), 0);
}

// ============================================================================
// sum
// ============================================================================

#[test]
fn test_sum_constant_data_scales_with_occupancy() {
    let session = BucketSession::new();
    let lons = LazyArray::from_vec(vec![0.2, 0.3]);
    let lats = LazyArray::from_vec(vec![3.8, 3.9]);
    let data = LazyArray::from_vec(constant_data(2, 2.0));
    let sums = session.sum(&identity_grid(), data, &lons, &lats).unwrap().compute();
    // Two samples of 2.0 in one cell.
    assert_eq!(sums.get(0, 0), Some(4.0));
}

#[test]
fn test_sum_routes_values_to_their_cells() {
    let session = BucketSession::new();
    let (lons, lats) = mixed_samples();
    let data = LazyArray::from_vec_chunked(ramp_data(6), 2);
    let sums = session.sum(&identity_grid(), data, &lons, &lats).unwrap().compute();

    assert_eq!(sums.get(0, 0), Some(0.0));
    assert_eq!(sums.get(1, 1), Some(1.0));
    assert_eq!(sums.get(3, 3), Some(2.0));
    assert_eq!(sums.get(2, 0), Some(5.0));
    // Unoccupied cells stay zero; discarded weights (3.0, 4.0) vanish.
    assert_eq!(sums.get(0, 1), Some(0.0));
    assert_eq!(sums.iter().sum::<f64>(), 8.0);
}

#[test]
fn test_sum_accepts_labeled_data() {
    let session = BucketSession::new();
    let (lons, lats) = mixed_samples();
    let plain = LazyArray::from_vec_chunked(ramp_data(6), 2);
    let labeled = LabeledArray::new(plain.clone())
        .with_name("brightness_temperature")
        .with_attr("units", "K");

    let from_plain = session.sum(&identity_grid(), plain, &lons, &lats).unwrap().compute();
    let from_labeled = session
        .sum(&identity_grid(), labeled, &lons, &lats)
        .unwrap()
        .compute();
    assert_eq!(from_plain, from_labeled);
}

#[test]
fn test_sum_length_mismatch_is_error() {
    let session = BucketSession::new();
    let (lons, lats) = mixed_samples();
    let data = LazyArray::from_vec(vec![1.0, 2.0]);
    assert!(session.sum(&identity_grid(), data, &lons, &lats).is_err());
}

// ============================================================================
// average
// ============================================================================

#[test]
fn test_average_is_sum_over_count() {
    let session = BucketSession::new();
    let lons = LazyArray::from_vec(vec![0.2, 0.3]);
    let lats = LazyArray::from_vec(vec![3.8, 3.9]);
    let data = LazyArray::from_vec(vec![1.0, 4.0]);
    let avg = session
        .average(&identity_grid(), data, &lons, &lats, f64::NAN)
        .unwrap()
        .compute();
    assert_eq!(avg.get(0, 0), Some(2.5));
}

#[test]
fn test_average_default_fill_marks_empty_cells_nan() {
    let session = BucketSession::new();
    let (lons, lats) = mixed_samples();
    let data = LazyArray::from_vec_chunked(constant_data(6, 2.0), 2);
    let avg = session
        .average(&identity_grid(), data, &lons, &lats, f64::NAN)
        .unwrap()
        .compute();

    assert_eq!(avg.get(0, 0), Some(2.0));
    assert!(avg.get(0, 1).unwrap().is_nan());
    assert_eq!(avg.iter().filter(|v| !v.is_nan()).count(), 4);
}

#[test]
fn test_average_fill_value_replaces_empty_cells() {
    let session = BucketSession::new();
    let (lons, lats) = mixed_samples();
    let data = LazyArray::from_vec_chunked(constant_data(6, 2.0), 2);
    let avg = session
        .average(&identity_grid(), data, &lons, &lats, -1.0)
        .unwrap()
        .compute();

    assert!(avg.iter().all(|v| !v.is_nan()));
    assert_eq!(avg.iter().fold(f64::MIN, f64::max), 2.0);
    assert_eq!(avg.iter().fold(f64::MAX, f64::min), -1.0);
    assert_eq!(avg.iter().filter(|v| *v == -1.0).count(), 12);
}

// ============================================================================
// Polar stereographic reference scenario
// ============================================================================

#[test]
fn test_polar_swath_count() {
    let session = BucketSession::new();
    let (grid, lons, lats) = polar_scenario();
    let counts = session.count(&grid, &lons, &lats).unwrap().compute();
    // One sample per bin: the 0.1 degree steps are ~11 km apart, far more
    // than one 3 km cell.
    assert_eq!(counts.iter().max(), Some(1));
    assert_eq!(counts.iter().filter(|v| *v == 1).count(), 4);
    assert_eq!(counts.shape(), grid.shape());
}

#[test]
fn test_polar_swath_sum() {
    let session = BucketSession::new();
    let (grid, lons, lats) = polar_scenario();
    let data = LazyArray::from_vec_chunked(constant_data(4, 2.0), 2);
    let sums = session.sum(&grid, data, &lons, &lats).unwrap().compute();
    assert_eq!(sums.iter().fold(f64::MIN, f64::max), 2.0);
    assert_eq!(sums.iter().filter(|v| *v == 2.0).count(), 4);
}

#[test]
fn test_polar_swath_average() {
    let session = BucketSession::new();
    let (grid, lons, lats) = polar_scenario();
    let data = LazyArray::from_vec_chunked(constant_data(4, 2.0), 2);

    let avg = session
        .average(&grid, data.clone(), &lons, &lats, f64::NAN)
        .unwrap()
        .compute();
    let occupied: Vec<f64> = avg.iter().filter(|v| !v.is_nan()).collect();
    assert_eq!(occupied.len(), 4);
    assert!(occupied.iter().all(|v| *v == 2.0));

    let filled = session
        .average(&grid, data, &lons, &lats, -1.0)
        .unwrap()
        .compute();
    assert!(filled.iter().all(|v| !v.is_nan()));
    assert_eq!(filled.iter().fold(f64::MIN, f64::max), 2.0);
    assert_eq!(filled.iter().fold(f64::MAX, f64::min), -1.0);
}

// ============================================================================
// Laziness and index reuse
// ============================================================================

/// Identity projection that counts how many chunk blocks it projects.
struct CountingProjection {
    calls: AtomicUsize,
}

impl CountingProjection {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

impl Projection for CountingProjection {
    fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        (lon, lat)
    }

    fn project_block(&self, lons: &[f64], lats: &[f64]) -> (Vec<f64>, Vec<f64>) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (lons.to_vec(), lats.to_vec())
    }
}

#[test]
fn test_aggregations_build_without_computing() {
    let session = BucketSession::new();
    let (lons, lats) = mixed_samples();
    let grid = identity_grid();
    let data = LazyArray::from_vec_chunked(constant_data(6, 2.0), 2);

    with_scheduler(Arc::new(CountingScheduler::new(0)), || {
        let sums = session.sum(&grid, data.clone(), &lons, &lats).unwrap();
        let counts = session.count(&grid, &lons, &lats).unwrap();
        let avg = session.average(&grid, data.clone(), &lons, &lats, -1.0).unwrap();
        assert_eq!(sums.shape(), (4, 4));
        assert_eq!(counts.shape(), (4, 4));
        assert_eq!(avg.shape(), (4, 4));
    });
}

#[test]
fn test_projection_runs_once_across_statistics() {
    let proj = Arc::new(CountingProjection::new());
    let grid = GridDefinition::new(
        4,
        4,
        Extent::new(0.0, 0.0, 4.0, 4.0),
        proj.clone() as Arc<dyn Projection>,
    );
    let session = BucketSession::new();
    let lons = LazyArray::from_vec_chunked(vec![0.2, 1.2, 2.6, 1.8], 2);
    let lats = LazyArray::from_vec_chunked(vec![3.8, 2.7, 1.4, 0.8], 2);
    let data = LazyArray::from_vec_chunked(constant_data(4, 2.0), 2);

    let sums = session.sum(&grid, data.clone(), &lons, &lats).unwrap();
    let counts = session.count(&grid, &lons, &lats).unwrap();
    let avg = session.average(&grid, data, &lons, &lats, f64::NAN).unwrap();
    assert_eq!(proj.calls.load(Ordering::SeqCst), 0);

    sums.compute();
    counts.compute();
    avg.compute();
    // Two input chunks, so two block calls total, shared by every
    // statistic through the cached indices and memoized graph nodes.
    assert_eq!(proj.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_index_cache_reused_across_statistics() {
    let session = BucketSession::new();
    let (lons, lats) = mixed_samples();
    let grid = identity_grid();
    let data = LazyArray::from_vec_chunked(constant_data(6, 2.0), 2);

    session.sum(&grid, data.clone(), &lons, &lats).unwrap();
    session.count(&grid, &lons, &lats).unwrap();
    session.average(&grid, data, &lons, &lats, f64::NAN).unwrap();

    let stats = session.cache_stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.entries, 1);
}

#[test]
fn test_distinct_swaths_get_distinct_cache_entries() {
    let session = BucketSession::new();
    let grid = identity_grid();
    let (lons_a, lats_a) = mixed_samples();
    let (lons_b, lats_b) = mixed_samples();

    session.count(&grid, &lons_a, &lats_a).unwrap();
    session.count(&grid, &lons_b, &lats_b).unwrap();
    // Identity keying: equal values, different arrays, separate entries.
    let stats = session.cache_stats();
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.entries, 2);
}

#[test]
fn test_precomputed_indices_build_without_computing() {
    let session = BucketSession::new();
    let (lons, lats) = mixed_samples();
    let grid = identity_grid();
    let indices = session.indices(&grid, &lons, &lats).unwrap();
    let data = LazyArray::from_vec_chunked(constant_data(6, 2.0), 2);

    with_scheduler(Arc::new(CountingScheduler::new(0)), || {
        session.sum_with_indices(&grid, data.clone(), &indices).unwrap();
        session.count_with_indices(&grid, &indices).unwrap();
        session
            .average_with_indices(&grid, data.clone(), &indices, -1.0)
            .unwrap();
    });
}
