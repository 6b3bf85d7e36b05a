//! Test data generators for creating synthetic swath-like data.
//!
//! These generators create predictable, verifiable patterns that can be
//! used across the test suite.

/// Creates paired lon/lat arrays along a straight swath track.
///
/// Sample `i` sits at `(lon0 + i * lon_step, lat0 + i * lat_step)`, so
/// positions are exactly predictable from the index.
///
/// # Arguments
///
/// * `len` - Number of samples
/// * `lon0`, `lat0` - Position of the first sample in degrees
/// * `lon_step`, `lat_step` - Per-sample increments in degrees
///
/// # Example
///
/// ```
/// use test_utils::swath_track;
///
/// let (lons, lats) = swath_track(3, 25.0, 60.0, 0.0, 0.1);
/// assert_eq!(lons, vec![25.0, 25.0, 25.0]);
/// assert_eq!(lats[2], 60.2);
/// ```
pub fn swath_track(
    len: usize,
    lon0: f64,
    lat0: f64,
    lon_step: f64,
    lat_step: f64,
) -> (Vec<f64>, Vec<f64>) {
    let mut lons = Vec::with_capacity(len);
    let mut lats = Vec::with_capacity(len);
    for i in 0..len {
        lons.push(lon0 + i as f64 * lon_step);
        lats.push(lat0 + i as f64 * lat_step);
    }
    (lons, lats)
}

/// Creates a constant-valued data array.
pub fn constant_data(len: usize, value: f64) -> Vec<f64> {
    vec![value; len]
}

/// Creates a data array where value equals sample index.
///
/// This makes aggregate sums verifiable by hand: the sum over samples
/// `a..b` is `(a + b - 1) * (b - a) / 2`.
pub fn ramp_data(len: usize) -> Vec<f64> {
    (0..len).map(|i| i as f64).collect()
}
