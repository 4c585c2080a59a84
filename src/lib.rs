//! gridfold: lattice-aware merging of 3D datasets from NetCDF/HDF5 containers
//!
//! Scientific containers often hold many independently stored 3D blocks
//! (refinement patches, tiles, time slices) that each carry their own grid
//! metadata as `origin`, `delta` and `iorigin` attributes. gridfold decides
//! which of those blocks sit on a common lattice, groups them, computes one
//! combined coordinate descriptor per group and writes each group out as a
//! sparse voxel volume.
//!
//! ## Module Organization
//!
//! - [`attributes`]: typed, size-checked reads of numeric attributes
//! - [`grid`]: [`GridDescriptor`], the per-dataset lattice description
//! - [`collection`]: grouping of descriptors into [`Collection`]s
//! - [`volume`]: sparse voxel volumes on a collection's lattice
//! - [`netcdf_io`]: dataset enumeration, sample reads and volume output
//! - [`metadata`]: container tree and attribute inspection
//! - [`pipeline`]: the end-to-end conversion driver
//! - [`parallel`]: Rayon thread pool configuration
//! - [`errors`]: centralized error handling
//!
//! ## Usage
//! ```rust
//! use gridfold::prelude::*;
//!
//! let a = GridDescriptor::new([0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [0, 0, 0]);
//! let b = GridDescriptor::new([5.0, 0.0, 0.0], [1.0, 1.0, 1.0], [5, 0, 0]);
//! let c = GridDescriptor::new([0.0, 0.0, 0.0], [2.0, 2.0, 2.0], [0, 0, 0]);
//!
//! let collections = group_datasets(
//!     [("a", a), ("b", b), ("c", c)],
//!     GroupingStrategy::Greedy,
//! )
//! .unwrap();
//! assert_eq!(collections.len(), 2);
//! assert_eq!(collections[0].descriptor().origin(), [0.0, 0.0, 0.0]);
//! ```

// Core modules
pub mod attributes;
pub mod cli;
pub mod collection;
pub mod errors;
pub mod grid;
pub mod metadata;
pub mod netcdf_io;
pub mod parallel;
pub mod pipeline;
pub mod volume;

pub use collection::{Collection, CollectionBuilder, GroupingStrategy};
pub use errors::{GridFoldError, Result};
pub use grid::GridDescriptor;

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::attributes::{get, AttributeData, AttributeMap, AttributeSource, RawAttribute};
    pub use crate::collection::{group_datasets, Collection, CollectionBuilder, GroupingStrategy};
    pub use crate::errors::{GridFoldError, Result};
    pub use crate::grid::GridDescriptor;
    pub use crate::parallel::ParallelConfig;
    pub use crate::pipeline::{ConversionConfig, Pipeline};
    pub use crate::volume::SparseVolume;
}
