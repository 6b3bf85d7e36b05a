//! Projection of paired coordinate arrays into rounded grid coordinates.

use std::sync::Arc;

use chunked_array::LazyArray;
use swath_common::Projection;

use crate::error::Result;
use crate::resolution::round_one;

/// Projected x/y coordinates, rounded to the grid resolution.
///
/// Both views share one underlying stacked computation, so the forward
/// projection runs once per chunk no matter how many of the views are
/// consumed, or how often.
#[derive(Debug, Clone)]
pub struct ProjectedCoordinates {
    stacked: LazyArray<f64>,
    x: LazyArray<f64>,
    y: LazyArray<f64>,
}

impl ProjectedCoordinates {
    /// Rounded projected x coordinates.
    pub fn x(&self) -> &LazyArray<f64> {
        &self.x
    }

    /// Rounded projected y coordinates.
    pub fn y(&self) -> &LazyArray<f64> {
        &self.y
    }

    /// The raw 2×N stacked form: each chunk holds its x values followed
    /// by its y values.
    pub fn stacked(&self) -> &LazyArray<f64> {
        &self.stacked
    }
}

/// Project paired lon/lat arrays and round the result to the pixel
/// resolution.
///
/// The projection capability is invoked exactly once per chunk, with the
/// whole chunk. Non-finite coordinates project to non-finite values and
/// are dealt with downstream; projection itself never fails.
pub fn project_coordinates(
    lons: &LazyArray<f64>,
    lats: &LazyArray<f64>,
    x_res: f64,
    y_res: f64,
    projection: &Arc<dyn Projection>,
) -> Result<ProjectedCoordinates> {
    let stacked_lens: Vec<usize> = lons.chunk_lens().iter().map(|len| len * 2).collect();
    let proj = projection.clone();
    let stacked = lons.zip_map_chunks(lats, stacked_lens, move |lon_chunk, lat_chunk| {
        let (xs, ys) = proj.project_block(lon_chunk, lat_chunk);
        let mut out = Vec::with_capacity(xs.len() + ys.len());
        out.extend(xs.into_iter().map(|x| round_one(x, x_res)));
        out.extend(ys.into_iter().map(|y| round_one(y, y_res)));
        out
    })?;

    let lens = lons.chunk_lens().to_vec();
    let x = stacked.map_chunks(lens.clone(), |chunk: &[f64]| {
        chunk[..chunk.len() / 2].to_vec()
    });
    let y = stacked.map_chunks(lens, |chunk: &[f64]| chunk[chunk.len() / 2..].to_vec());

    Ok(ProjectedCoordinates { stacked, x, y })
}
