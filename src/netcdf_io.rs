//! NetCDF/HDF5 container access: dataset enumeration, sample reads and
//! sparse volume output
//!
//! Datasets are addressed by their slash-joined group path (`run1/density`);
//! root-level variables carry no prefix.

use crate::errors::{GridFoldError, Result};
use crate::volume::SparseVolume;
use chrono::Utc;
use log::{debug, info};
use ndarray::{Array3, ArrayD};
use netcdf::{create, File, Group, Variable};
use regex::Regex;
use std::collections::BTreeSet;
use std::ops::ControlFlow;
use std::{fs, path::Path};

/// A dataset found in a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetEntry {
    /// Slash-joined group path and variable name
    pub path: String,
    pub dimensions: Vec<String>,
    pub shape: Vec<usize>,
}

impl DatasetEntry {
    fn from_variable(path: String, var: &Variable) -> Self {
        Self {
            path,
            dimensions: var.dimensions().iter().map(|d| d.name().to_string()).collect(),
            shape: var.dimensions().iter().map(|d| d.len()).collect(),
        }
    }

    #[must_use]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    #[must_use]
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Anchor a dataset pattern so it must match a whole path
///
/// # Errors
///
/// [`GridFoldError::InvalidPattern`] if the expression does not compile.
pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    Ok(Regex::new(&format!("^(?:{pattern})$"))?)
}

pub(crate) fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// Visit every variable below `group` depth-first, variables before subgroups
fn walk_group<B>(
    group: &Group,
    prefix: &str,
    visit: &mut dyn FnMut(&str, &Variable) -> ControlFlow<B>,
) -> ControlFlow<B> {
    for var in group.variables() {
        visit(&join_path(prefix, &var.name()), &var)?;
    }
    for sub in group.groups() {
        walk_group(&sub, &join_path(prefix, &sub.name()), visit)?;
    }
    ControlFlow::Continue(())
}

fn walk_file<B>(file: &File, visit: &mut dyn FnMut(&str, &Variable) -> ControlFlow<B>) -> ControlFlow<B> {
    match file.root() {
        Some(root) => walk_group(&root, "", visit),
        None => {
            // classic format files have no group hierarchy
            for var in file.variables() {
                visit(&var.name(), &var)?;
            }
            ControlFlow::Continue(())
        }
    }
}

/// Run `f` on every dataset in storage order, stopping at the first error
///
/// The container is walked once, so callers that need every dataset should
/// prefer this over repeated [`with_dataset`] lookups.
///
/// # Errors
///
/// The first error returned by `f`.
pub fn for_each_dataset(file: &File, mut f: impl FnMut(&str, &Variable) -> Result<()>) -> Result<()> {
    let outcome = walk_file(file, &mut |path, var| match f(path, var) {
        Ok(()) => ControlFlow::Continue(()),
        Err(e) => ControlFlow::Break(e),
    });
    match outcome {
        ControlFlow::Break(e) => Err(e),
        ControlFlow::Continue(()) => Ok(()),
    }
}

/// All datasets whose full path matches `pattern`, in storage order
#[must_use]
pub fn list_datasets(file: &File, pattern: &Regex) -> Vec<DatasetEntry> {
    let mut found = Vec::new();
    let _ = walk_file::<()>(file, &mut |path, var| {
        if pattern.is_match(path) {
            found.push(DatasetEntry::from_variable(path.to_string(), var));
        }
        ControlFlow::Continue(())
    });
    debug!("{} dataset(s) match '{}'", found.len(), pattern.as_str());
    found
}

/// Run `f` on the dataset at `path`
///
/// # Errors
///
/// [`GridFoldError::DatasetNotFound`] if no variable has that path, otherwise
/// whatever `f` returns.
pub fn with_dataset<T>(file: &File, path: &str, f: impl FnOnce(&Variable) -> Result<T>) -> Result<T> {
    let mut f = Some(f);
    let outcome = walk_file(file, &mut |candidate, var| {
        if candidate == path {
            // `f` is only taken once because the walk breaks right after
            match f.take() {
                Some(f) => ControlFlow::Break(f(var)),
                None => ControlFlow::Continue(()),
            }
        } else {
            ControlFlow::Continue(())
        }
    });

    match outcome {
        ControlFlow::Break(result) => result,
        ControlFlow::Continue(()) => Err(GridFoldError::DatasetNotFound {
            dataset: path.to_string(),
        }),
    }
}

/// Read the full sample block of a 3D dataset as `f32`
///
/// # Errors
///
/// [`GridFoldError::InvalidDataset`] if the variable is not three-dimensional,
/// or any container read error.
pub fn read_volume(var: &Variable) -> Result<Array3<f32>> {
    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
    let &[nx, ny, nz] = shape.as_slice() else {
        return Err(GridFoldError::InvalidDataset {
            dataset: var.name().to_string(),
            reason: format!("expected 3 dimensions, found {}", shape.len()),
        });
    };

    let data: Vec<f32> = var.get_values::<f32, _>(..)?;
    Ok(Array3::from_shape_vec((nx, ny, nz), data)?)
}

/// Writes a [`SparseVolume`] as a coordinate-list NetCDF file
///
/// Layout: dimensions `voxel` (active voxel count) and `axis` (3); variables
/// `index(voxel, axis)` holding lattice indices and `value(voxel)`; global
/// attributes describing the lattice transform and provenance.
///
/// NetCDF treats a zero length as unlimited, so an empty volume is written
/// with an unlimited `voxel` dimension of current length 0.
pub struct VolumeWriter<'a> {
    output_path: &'a Path,
}

impl<'a> VolumeWriter<'a> {
    /// Create a new volume writer
    pub fn new(output_path: &'a Path) -> Self {
        Self { output_path }
    }

    /// Write `volume`, replacing any existing file
    ///
    /// # Errors
    ///
    /// Any I/O or NetCDF error while creating the file.
    pub fn write(&self, volume: &SparseVolume, datasets: &BTreeSet<String>) -> Result<()> {
        if self.output_path.exists() {
            fs::remove_file(self.output_path)?;
        }

        let mut file = create(self.output_path)?;

        let count = volume.active_voxel_count();
        file.add_dimension("voxel", count)?;
        file.add_dimension("axis", 3)?;

        let indices: Vec<i32> = volume.voxels().keys().flatten().copied().collect();
        let values: Vec<f32> = volume.voxels().values().copied().collect();

        {
            let mut index_var = file.add_variable::<i32>("index", &["voxel", "axis"])?;
            index_var.put_attribute("long_name", "lattice index")?;
            if count > 0 {
                let indices = ArrayD::from_shape_vec(vec![count, 3], indices)?;
                index_var.put(indices.view(), ..)?;
            }
        }
        {
            let mut value_var = file.add_variable::<f32>("value", &["voxel"])?;
            value_var.put_attribute("_FillValue", volume.background())?;
            if count > 0 {
                let values = ArrayD::from_shape_vec(vec![count], values)?;
                value_var.put(values.view(), ..)?;
            }
        }

        let descriptor = volume.descriptor();
        file.add_attribute("name", descriptor.name())?;
        file.add_attribute("origin", descriptor.origin().to_vec())?;
        file.add_attribute("delta", descriptor.scale().to_vec())?;
        file.add_attribute("iorigin", descriptor.iorigin().to_vec())?;
        file.add_attribute("background", volume.background())?;
        file.add_attribute(
            "datasets",
            datasets.iter().cloned().collect::<Vec<_>>().join(", "),
        )?;
        file.add_attribute(
            "history",
            format!("Created by gridfold on {}", Utc::now().to_rfc3339()),
        )?;

        info!(
            "Wrote {count} active voxel(s) to {}",
            self.output_path.display()
        );
        Ok(())
    }
}
