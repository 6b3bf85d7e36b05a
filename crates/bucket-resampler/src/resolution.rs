//! Rounding values to a grid resolution.
//!
//! Projected coordinates are snapped to the pixel resolution before index
//! computation so that samples sitting a float-epsilon apart agree on
//! their cell.

use chunked_array::LazyArray;

/// Round a single value to the nearest multiple of `resolution`.
#[inline]
pub(crate) fn round_one(value: f64, resolution: f64) -> f64 {
    resolution * (value / resolution).round()
}

/// Input forms accepted by [`round_to_resolution`].
pub trait RoundToResolution {
    type Output;

    fn round_to_resolution(self, resolution: f64) -> Self::Output;
}

/// Round `values` to the nearest multiple of `resolution`.
///
/// Accepts a scalar, a slice, an owned vector, or a lazy array; the lazy
/// form stays lazy. NaN values stay NaN.
pub fn round_to_resolution<V: RoundToResolution>(values: V, resolution: f64) -> V::Output {
    values.round_to_resolution(resolution)
}

impl RoundToResolution for f64 {
    type Output = f64;

    fn round_to_resolution(self, resolution: f64) -> f64 {
        round_one(self, resolution)
    }
}

impl RoundToResolution for &[f64] {
    type Output = Vec<f64>;

    fn round_to_resolution(self, resolution: f64) -> Vec<f64> {
        self.iter().map(|v| round_one(*v, resolution)).collect()
    }
}

impl RoundToResolution for Vec<f64> {
    type Output = Vec<f64>;

    fn round_to_resolution(self, resolution: f64) -> Vec<f64> {
        self.as_slice().round_to_resolution(resolution)
    }
}

impl RoundToResolution for &LazyArray<f64> {
    type Output = LazyArray<f64>;

    fn round_to_resolution(self, resolution: f64) -> LazyArray<f64> {
        self.map(move |v| round_one(v, resolution))
    }
}

impl RoundToResolution for LazyArray<f64> {
    type Output = LazyArray<f64>;

    fn round_to_resolution(self, resolution: f64) -> LazyArray<f64> {
        (&self).round_to_resolution(resolution)
    }
}
