//! Sparse voxel volumes built from grouped datasets
//!
//! A [`SparseVolume`] stores only active samples, keyed by their index on the
//! collection's lattice. Each dataset's local index `ijk` maps to lattice index
//! `iorigin + ijk`, so datasets of one collection land in a shared frame; the
//! collection's combined descriptor supplies the index-to-world transform.

use crate::errors::{GridFoldError, Result};
use crate::grid::GridDescriptor;
use log::{debug, warn};
use ndarray::Array3;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Active voxels of one collection on its lattice
#[derive(Debug, Clone)]
pub struct SparseVolume {
    descriptor: GridDescriptor,
    background: f32,
    voxels: BTreeMap<[i32; 3], f32>,
    overwritten: usize,
}

impl SparseVolume {
    /// Empty volume in the frame of `descriptor`
    #[must_use]
    pub fn new(descriptor: GridDescriptor, background: f32) -> Self {
        Self {
            descriptor,
            background,
            voxels: BTreeMap::new(),
            overwritten: 0,
        }
    }

    #[must_use]
    pub const fn descriptor(&self) -> &GridDescriptor {
        &self.descriptor
    }

    /// Sample value treated as inactive
    #[must_use]
    pub const fn background(&self) -> f32 {
        self.background
    }

    /// Active voxels ordered by lattice index
    #[must_use]
    pub const fn voxels(&self) -> &BTreeMap<[i32; 3], f32> {
        &self.voxels
    }

    #[must_use]
    pub fn value_at(&self, ijk: [i32; 3]) -> Option<f32> {
        self.voxels.get(&ijk).copied()
    }

    #[must_use]
    pub fn active_voxel_count(&self) -> usize {
        self.voxels.len()
    }

    /// Number of voxels replaced by a later dataset
    #[must_use]
    pub const fn overwritten_count(&self) -> usize {
        self.overwritten
    }

    /// Add the active samples of one dataset
    ///
    /// Samples that are not finite or equal the background are skipped. A
    /// sample landing on an occupied voxel replaces it. Returns the number of
    /// samples inserted.
    ///
    /// # Errors
    ///
    /// - [`GridFoldError::PreconditionViolation`] if the dataset spacing
    ///   differs from the volume's
    /// - [`GridFoldError::InvalidDataset`] if `iorigin + extent - 1` leaves
    ///   the `i32` range on any axis
    pub fn insert_dataset(
        &mut self,
        name: &str,
        dataset: &GridDescriptor,
        samples: &Array3<f32>,
    ) -> Result<usize> {
        if dataset.scale() != self.descriptor.scale() {
            return Err(GridFoldError::PreconditionViolation(format!(
                "dataset '{name}' does not share the volume's grid spacing"
            )));
        }

        let (nx, ny, nz) = samples.dim();
        let offset = dataset.iorigin();
        // the last index on every axis must fit, then no sample index overflows
        for (axis, extent) in [nx, ny, nz].into_iter().enumerate() {
            let last = i32::try_from(extent.saturating_sub(1))
                .ok()
                .and_then(|span| offset[axis].checked_add(span));
            if last.is_none() {
                return Err(GridFoldError::InvalidDataset {
                    dataset: name.to_string(),
                    reason: format!(
                        "extent {extent} from index origin {} leaves the i32 index range on axis {axis}",
                        offset[axis]
                    ),
                });
            }
        }

        let background = self.background;
        let data: Vec<f32> = samples.iter().copied().collect();

        debug!(
            "Extracting active voxels of '{name}' from {} samples across {} threads",
            data.len(),
            rayon::current_num_threads()
        );

        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let active: Vec<([i32; 3], f32)> = data
            .par_iter()
            .enumerate()
            .filter(|&(_, &value)| value.is_finite() && value != background)
            .map(|(flat, &value)| {
                let k = flat % nz;
                let j = (flat / nz) % ny;
                let i = flat / (ny * nz);
                (
                    [
                        offset[0] + i as i32,
                        offset[1] + j as i32,
                        offset[2] + k as i32,
                    ],
                    value,
                )
            })
            .collect();

        let inserted = active.len();
        let mut replaced = 0;
        for (ijk, value) in active {
            if self.voxels.insert(ijk, value).is_some() {
                replaced += 1;
            }
        }
        if replaced > 0 {
            warn!("'{name}' overwrote {replaced} voxel(s) already set by another dataset");
        }
        self.overwritten += replaced;

        Ok(inserted)
    }

    /// Smallest and largest active lattice index per axis
    #[must_use]
    pub fn index_bounds(&self) -> Option<([i32; 3], [i32; 3])> {
        let mut keys = self.voxels.keys();
        let first = *keys.next()?;
        Some(keys.fold((first, first), |(lo, hi), ijk| {
            (
                std::array::from_fn(|a| lo[a].min(ijk[a])),
                std::array::from_fn(|a| hi[a].max(ijk[a])),
            )
        }))
    }

    /// World positions of the extreme active voxels
    #[must_use]
    pub fn world_bounds(&self) -> Option<([f64; 3], [f64; 3])> {
        self.index_bounds().map(|(lo, hi)| {
            (
                self.descriptor.index_to_world(lo),
                self.descriptor.index_to_world(hi),
            )
        })
    }
}
