//! Polar stereographic projection.
//!
//! The standard projection for high-latitude satellite swath products.
//! Spherical form with a configurable true-scale latitude; the plane is
//! tangent (or secant) at the pole, and scale is exact along `lat_ts`.
//!
//! The projection parameters are:
//! - Central meridian (lon0): the longitude pointing "down" the y axis
//! - True-scale latitude (lat_ts): where distances are undistorted
//! - Hemisphere: north or south pole aspect

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use swath_common::Projection;

/// Mean earth radius in meters.
const EARTH_RADIUS: f64 = 6_371_229.0;

/// Spherical polar stereographic projection.
///
/// For the north aspect, projected y points from the pole toward
/// `lon0 + 180°`, so points on the central meridian have negative y.
#[derive(Debug, Clone)]
pub struct PolarStereographic {
    /// Central meridian in radians
    lon0: f64,
    /// +1.0 for the north pole aspect, -1.0 for the south
    sign: f64,
    /// Precomputed radius scale `R * (1 + sin(|lat_ts|))`
    rho_scale: f64,
}

impl PolarStereographic {
    /// North pole aspect with the given central meridian and true-scale
    /// latitude, both in degrees.
    pub fn north(lon0_deg: f64, lat_ts_deg: f64) -> Self {
        Self::with_sign(lon0_deg, lat_ts_deg, 1.0)
    }

    /// South pole aspect. `lat_ts_deg` is given as a southern latitude
    /// (negative), e.g. -71.0 for the common Antarctic grids.
    pub fn south(lon0_deg: f64, lat_ts_deg: f64) -> Self {
        Self::with_sign(lon0_deg, lat_ts_deg, -1.0)
    }

    fn with_sign(lon0_deg: f64, lat_ts_deg: f64, sign: f64) -> Self {
        let lat_ts = (sign * lat_ts_deg).to_radians();
        Self {
            lon0: lon0_deg.to_radians(),
            sign,
            rho_scale: EARTH_RADIUS * (1.0 + lat_ts.sin()),
        }
    }

    /// Distance from the pole in the projection plane for a latitude in
    /// radians.
    fn rho(&self, lat: f64) -> f64 {
        self.rho_scale * (FRAC_PI_4 - self.sign * lat / 2.0).tan()
    }

    /// Inverse transform: projected (x, y) in meters to (lon, lat) in
    /// degrees.
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let rho = x.hypot(y);
        let lat = self.sign * (FRAC_PI_2 - 2.0 * (rho / self.rho_scale).atan());
        let lon = self.lon0 + x.atan2(-self.sign * y);
        (lon.to_degrees(), lat.to_degrees())
    }
}

impl Projection for PolarStereographic {
    fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let rho = self.rho(lat.to_radians());
        let dlon = lon.to_radians() - self.lon0;
        (rho * dlon.sin(), -self.sign * rho * dlon.cos())
    }
}
