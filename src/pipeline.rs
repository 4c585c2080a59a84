//! Conversion driver
//!
//! Opens the input containers, extracts a [`GridDescriptor`] for every dataset
//! matching the configured pattern, groups them into [`Collection`]s and
//! optionally writes one sparse volume per collection.

use crate::attributes::{AttributeSource, RawAttribute};
use crate::collection::{Collection, CollectionBuilder, GroupingStrategy};
use crate::errors::{GridFoldError, Result};
use crate::grid::{GridDescriptor, DELTA_ATTRIBUTE, IORIGIN_ATTRIBUTE, ORIGIN_ATTRIBUTE};
use crate::netcdf_io::{compile_pattern, for_each_dataset, read_volume, VolumeWriter};
use crate::volume::SparseVolume;
use log::{info, warn};
use netcdf::{File, Variable};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Settings of one conversion run
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    /// Regular expression a dataset path must match in full
    pub pattern: String,
    pub strategy: GroupingStrategy,
    /// Exclude datasets with bad metadata instead of aborting
    pub skip_invalid: bool,
    /// Sample value treated as inactive
    pub background: f32,
    /// Attribute names for `[origin, delta, iorigin]`
    pub attribute_names: [String; 3],
    /// Output file; `None` only reports the collections
    pub output: Option<PathBuf>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            pattern: ".*".to_string(),
            strategy: GroupingStrategy::Greedy,
            skip_invalid: false,
            background: 0.0,
            attribute_names: [
                ORIGIN_ATTRIBUTE.to_string(),
                DELTA_ATTRIBUTE.to_string(),
                IORIGIN_ATTRIBUTE.to_string(),
            ],
            output: None,
        }
    }
}

/// A dataset whose grid metadata was read successfully
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedDataset {
    /// Name used in collections, unique across inputs
    pub name: String,
    /// Index of the input container
    pub input: usize,
    /// Path within the container
    pub path: String,
    pub descriptor: GridDescriptor,
}

/// Result of [`Pipeline::run`]
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub datasets: Vec<ExtractedDataset>,
    pub collections: Vec<Collection>,
    /// Files written, one per non-empty collection, empty for report-only runs
    pub outputs: Vec<PathBuf>,
}

/// A variable seen under its full container path
struct DatasetHandle<'a, 'f> {
    path: &'a str,
    var: &'a Variable<'f>,
}

impl AttributeSource for DatasetHandle<'_, '_> {
    fn location(&self) -> String {
        self.path.to_string()
    }

    fn open_attribute(&self, name: &str) -> Result<RawAttribute> {
        self.var.open_attribute(name).map_err(|e| match e {
            GridFoldError::AttributeNotFound { attribute, .. } => GridFoldError::AttributeNotFound {
                attribute,
                location: self.path.to_string(),
            },
            other => other,
        })
    }

    fn attribute_names(&self) -> Vec<String> {
        self.var.attribute_names()
    }
}

/// Label derived from a dataset path, one token per path component
#[must_use]
pub fn label_for(path: &str) -> String {
    path.replace('/', " ")
}

/// Read and validate the grid metadata of one 3D dataset
///
/// # Errors
///
/// - [`GridFoldError::InvalidDataset`] if the variable is not three-dimensional
/// - attribute errors from [`GridDescriptor::from_named_attributes`]
/// - [`GridFoldError::DegenerateDelta`] if any spacing is zero
pub fn extract_descriptor(var: &Variable, path: &str, config: &ConversionConfig) -> Result<GridDescriptor> {
    let rank = var.dimensions().len();
    if rank != 3 {
        return Err(GridFoldError::InvalidDataset {
            dataset: path.to_string(),
            reason: format!("expected 3 dimensions, found {rank}"),
        });
    }

    let [origin, delta, iorigin] = &config.attribute_names;
    let handle = DatasetHandle { path, var };
    let descriptor = GridDescriptor::from_named_attributes(
        &handle,
        [origin.as_str(), delta.as_str(), iorigin.as_str()],
        Some(&label_for(path)),
    )?;

    if let Some(axis) = descriptor.degenerate_axis() {
        return Err(GridFoldError::DegenerateDelta {
            dataset: path.to_string(),
            axis,
        });
    }
    Ok(descriptor)
}

/// `base` for a single collection, `<stem>_<index>.<ext>` otherwise
#[must_use]
pub fn output_path_for(base: &Path, index: usize, total: usize) -> PathBuf {
    if total == 1 {
        return base.to_path_buf();
    }
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "volume".to_string());
    let file_name = match base.extension() {
        Some(ext) => format!("{stem}_{index}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{index}"),
    };
    base.with_file_name(file_name)
}

/// Input containers plus the run configuration
pub struct Pipeline {
    config: ConversionConfig,
    inputs: Vec<(String, File)>,
}

impl Pipeline {
    /// Open all `paths` read-only
    ///
    /// # Errors
    ///
    /// Any error opening a container.
    pub fn open<P: AsRef<Path>>(paths: &[P], config: ConversionConfig) -> Result<Self> {
        let inputs = paths
            .iter()
            .map(|p| {
                let p = p.as_ref();
                info!("Opening {}", p.display());
                Ok((p.display().to_string(), netcdf::open(p)?))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { config, inputs })
    }

    #[must_use]
    pub const fn config(&self) -> &ConversionConfig {
        &self.config
    }

    fn dataset_name(&self, input: usize, path: &str) -> String {
        if self.inputs.len() == 1 {
            path.to_string()
        } else {
            format!("{}:{path}", self.inputs[input].0)
        }
    }

    /// Extract descriptors of all matching datasets in input order
    ///
    /// # Errors
    ///
    /// An invalid pattern, or the first dataset-level error unless
    /// `skip_invalid` is set.
    pub fn scan(&self) -> Result<Vec<ExtractedDataset>> {
        let pattern = compile_pattern(&self.config.pattern)?;
        let mut extracted = Vec::new();

        for (input, (source, file)) in self.inputs.iter().enumerate() {
            for_each_dataset(file, |path, var| {
                if !pattern.is_match(path) {
                    return Ok(());
                }
                match extract_descriptor(var, path, &self.config) {
                    Ok(descriptor) => extracted.push(ExtractedDataset {
                        name: self.dataset_name(input, path),
                        input,
                        path: path.to_string(),
                        descriptor,
                    }),
                    Err(e) if self.config.skip_invalid && e.is_dataset_local() => {
                        warn!("Skipping '{path}' in {source}: {e}");
                    }
                    Err(e) => return Err(e),
                }
                Ok(())
            })?;
        }

        info!("Extracted grid metadata of {} dataset(s)", extracted.len());
        Ok(extracted)
    }

    /// Fold extracted datasets into collections
    ///
    /// # Errors
    ///
    /// See [`CollectionBuilder::insert`] and [`CollectionBuilder::build`].
    pub fn group(&self, datasets: &[ExtractedDataset]) -> Result<Vec<Collection>> {
        let mut builder = CollectionBuilder::with_strategy(self.config.strategy);
        for dataset in datasets {
            builder.insert(dataset.name.clone(), dataset.descriptor.clone())?;
        }
        let collections = builder.build()?;
        info!("Grouped into {} collection(s)", collections.len());
        Ok(collections)
    }

    /// Build the sparse volume of one collection
    ///
    /// Members are read in scan order (input file, then storage order), so a
    /// later member overwrites an earlier one where they overlap.
    ///
    /// # Errors
    ///
    /// Any error reading sample data of a member dataset, or
    /// [`GridFoldError::DatasetNotFound`] for a member missing from `datasets`.
    pub fn build_volume(&self, collection: &Collection, datasets: &[ExtractedDataset]) -> Result<SparseVolume> {
        let mut volume = SparseVolume::new(collection.descriptor().clone(), self.config.background);
        let mut visited: HashSet<&str> = HashSet::new();

        for (input, (_, file)) in self.inputs.iter().enumerate() {
            let members: HashMap<&str, &ExtractedDataset> = datasets
                .iter()
                .filter(|d| d.input == input && collection.contains(&d.name))
                .map(|d| (d.path.as_str(), d))
                .collect();
            if members.is_empty() {
                continue;
            }

            for_each_dataset(file, |path, var| {
                if let Some(&dataset) = members.get(path) {
                    let samples = read_volume(var)?;
                    volume.insert_dataset(&dataset.name, &dataset.descriptor, &samples)?;
                    visited.insert(dataset.name.as_str());
                }
                Ok(())
            })?;
        }

        if let Some(missing) = collection.names().iter().find(|n| !visited.contains(n.as_str())) {
            return Err(GridFoldError::DatasetNotFound {
                dataset: missing.clone(),
            });
        }
        Ok(volume)
    }

    /// Scan, group and (if an output is configured) export
    ///
    /// Collections without active voxels are reported but not written; their
    /// output index is left unused.
    ///
    /// # Errors
    ///
    /// The first error of any stage; nothing is written after a grouping
    /// failure.
    pub fn run(&self) -> Result<RunSummary> {
        let datasets = self.scan()?;
        let collections = self.group(&datasets)?;

        let mut outputs = Vec::new();
        if let Some(base) = &self.config.output {
            for (k, collection) in collections.iter().enumerate() {
                let volume = self.build_volume(collection, &datasets)?;
                let path = output_path_for(base, k, collections.len());
                if volume.active_voxel_count() == 0 {
                    warn!(
                        "Collection {k} has no active voxels, not writing {}",
                        path.display()
                    );
                    continue;
                }
                VolumeWriter::new(&path).write(&volume, collection.names())?;
                outputs.push(path);
            }
        }

        Ok(RunSummary {
            datasets,
            collections,
            outputs,
        })
    }
}
