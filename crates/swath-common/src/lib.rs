//! Common types shared across the swath-resample workspace.

pub mod extent;
pub mod grid;
pub mod projection;

pub use extent::Extent;
pub use grid::{GridDefinition, GridId};
pub use projection::Projection;
