//! Equirectangular (plate carrée) projection.

use swath_common::Projection;

/// Equirectangular projection: longitude and latitude mapped linearly to
/// x and y.
///
/// With a scale of 1.0 the mapping is the identity (degrees in, degrees
/// out), which keeps grid arithmetic exactly predictable; a scale of
/// ~111,320 gives approximate meters at the equator.
#[derive(Debug, Clone)]
pub struct Equirectangular {
    /// Projected units per degree.
    scale: f64,
}

impl Equirectangular {
    /// Create with an explicit units-per-degree scale.
    pub fn new(scale: f64) -> Self {
        Self { scale }
    }

    /// Identity mapping: projected coordinates equal degrees.
    pub fn identity() -> Self {
        Self { scale: 1.0 }
    }
}

impl Projection for Equirectangular {
    fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        (lon * self.scale, lat * self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let proj = Equirectangular::identity();
        assert_eq!(proj.project(12.5, -3.25), (12.5, -3.25));
    }

    #[test]
    fn test_scaled() {
        let proj = Equirectangular::new(100.0);
        assert_eq!(proj.project(1.5, -2.0), (150.0, -200.0));
    }

    #[test]
    fn test_block_matches_scalar() {
        let proj = Equirectangular::new(2.0);
        let (xs, ys) = proj.project_block(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]);
        assert_eq!(xs, vec![2.0, 4.0, 6.0]);
        assert_eq!(ys, vec![8.0, 10.0, 12.0]);
    }
}
