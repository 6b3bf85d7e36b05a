//! Forward-projection capability used by grid definitions.

/// Forward map projection from geographic to projected coordinates.
///
/// Geographic input is (longitude, latitude) in degrees; output is
/// projected (x, y), typically in meters. Implementations must be pure:
/// the same input always yields the same output. Non-finite inputs flow
/// through as non-finite outputs rather than errors.
pub trait Projection: Send + Sync {
    /// Project a single coordinate pair.
    fn project(&self, lon: f64, lat: f64) -> (f64, f64);

    /// Project paired coordinate slices in one call.
    ///
    /// The default implementation loops over [`Self::project`];
    /// implementations with a cheaper batch path can override it. Both
    /// slices must have the same length.
    fn project_block(&self, lons: &[f64], lats: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let mut xs = Vec::with_capacity(lons.len());
        let mut ys = Vec::with_capacity(lats.len());
        for (lon, lat) in lons.iter().zip(lats.iter()) {
            let (x, y) = self.project(*lon, *lat);
            xs.push(x);
            ys.push(y);
        }
        (xs, ys)
    }
}
