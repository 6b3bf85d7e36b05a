//! Lazy chunked one-dimensional numeric arrays.
//!
//! Operations on a [`LazyArray`] build a deferred computation graph;
//! nothing executes until [`LazyArray::compute`] walks the graph through
//! the current [`Scheduler`]. This enables:
//!
//! - **Deferred pipelines**: whole aggregation graphs assemble without
//!   touching the data
//! - **Chunk parallelism**: independent chunks evaluate concurrently on
//!   the rayon thread pool
//! - **Exactly-once evaluation**: node results are memoized, so a node
//!   shared by several consumers (or materialized repeatedly) runs at
//!   most once per process
//!
//! # Architecture
//!
//! ```text
//! from_vec_chunked(...)            graph building (no execution)
//!      │
//!      ├─► map / zip_map           elementwise nodes
//!      ├─► map_chunks / zip_map_chunks   whole-chunk kernels
//!      └─► reduce_chunks / rechunk       all-chunk nodes
//!               │
//!               ▼
//!          compute()               one scheduler pass, chunk-parallel
//! ```
//!
//! # Example
//!
//! ```
//! use chunked_array::LazyArray;
//!
//! let arr = LazyArray::from_vec_chunked(vec![1.0, 2.0, 3.0, 4.0], 2);
//! let doubled = arr.map(|v: f64| v * 2.0);
//! // Nothing has run yet.
//! assert_eq!(doubled.compute(), vec![2.0, 4.0, 6.0, 8.0]);
//! ```

pub mod array;
pub mod error;
pub mod labeled;
pub mod scheduler;

pub use array::{ArrayToken, Element, LazyArray};
pub use error::{ArrayError, Result};
pub use labeled::LabeledArray;
pub use scheduler::{
    with_scheduler, CountingScheduler, RayonScheduler, Scheduler, SerialScheduler,
};
