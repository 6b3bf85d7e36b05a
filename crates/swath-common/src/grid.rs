//! Target grid definitions for bucket resampling.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::{Extent, Projection};

static NEXT_GRID_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique identity token for a grid definition.
///
/// Clones of a definition share the token; two independently constructed
/// definitions never do, even with identical parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridId(u64);

/// Definition of a target grid: shape, projected extent, and the forward
/// projection that maps geographic samples onto it.
///
/// Immutable once constructed. Row 0 sits at the top of the grid
/// (`max_y` edge); rows increase southward in projected y.
#[derive(Clone)]
pub struct GridDefinition {
    n_rows: usize,
    n_cols: usize,
    extent: Extent,
    projection: Arc<dyn Projection>,
    id: GridId,
}

impl GridDefinition {
    /// Create a new grid definition.
    pub fn new(
        n_rows: usize,
        n_cols: usize,
        extent: Extent,
        projection: Arc<dyn Projection>,
    ) -> Self {
        Self {
            n_rows,
            n_cols,
            extent,
            projection,
            id: GridId(NEXT_GRID_ID.fetch_add(1, Ordering::Relaxed)),
        }
    }

    /// Grid dimensions as (rows, columns).
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    /// The projected extent covered by the grid.
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// The forward projection for this grid.
    pub fn projection(&self) -> &Arc<dyn Projection> {
        &self.projection
    }

    /// Identity token for cache keying.
    pub fn id(&self) -> GridId {
        self.id
    }

    /// Pixel resolution (x, y) derived from extent and shape.
    pub fn resolution(&self) -> (f64, f64) {
        (
            self.extent.width() / self.n_cols as f64,
            self.extent.height() / self.n_rows as f64,
        )
    }

    /// Total number of grid cells.
    pub fn len(&self) -> usize {
        self.n_rows * self.n_cols
    }

    /// Check if the grid has no cells.
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0 || self.n_cols == 0
    }
}

impl fmt::Debug for GridDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridDefinition")
            .field("n_rows", &self.n_rows)
            .field("n_cols", &self.n_cols)
            .field("extent", &self.extent)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Identity;

    impl Projection for Identity {
        fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
            (lon, lat)
        }
    }

    fn grid(n_rows: usize, n_cols: usize) -> GridDefinition {
        GridDefinition::new(
            n_rows,
            n_cols,
            Extent::new(0.0, 0.0, 10.0, 10.0),
            Arc::new(Identity),
        )
    }

    #[test]
    fn test_resolution_from_extent_and_shape() {
        let grid = grid(5, 4);
        let (x_res, y_res) = grid.resolution();
        assert!((x_res - 2.5).abs() < f64::EPSILON);
        assert!((y_res - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_identity_tokens() {
        let a = grid(2, 2);
        let b = grid(2, 2);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id(), a.clone().id());
    }

    #[test]
    fn test_len() {
        let grid = grid(3, 4);
        assert_eq!(grid.len(), 12);
        assert!(!grid.is_empty());
    }
}
