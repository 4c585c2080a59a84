//! Defines command-line interface options using `clap` for the gridfold application.

use crate::collection::GroupingStrategy;
use crate::pipeline::ConversionConfig;
use clap::Parser;
use std::path::PathBuf;

/// Group lattice-aligned 3D datasets of NetCDF/HDF5 containers and export
/// them as sparse volumes
#[derive(Parser, Debug)]
#[command(
    version,
    name = "gridfold",
    about = "Inspect NetCDF/HDF5 containers and merge lattice-aligned 3D datasets into sparse volumes"
)]
pub struct Args {
    /// Input container file(s)
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<PathBuf>,

    /// Regular expression the full dataset path (`group/sub/name`) must match,
    /// for both --list and conversion
    #[arg(short, long, default_value = ".*")]
    pub pattern: String,

    /// Print the container tree instead of converting
    #[arg(long)]
    pub list: bool,

    /// With --list, also print type, attributes and extents of each dataset
    #[arg(long, requires = "list")]
    pub detail: bool,

    /// Output volume file. Several collections are written as <stem>_<k>.<ext>.
    /// If not set, only the collections are reported.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Group by connected components of the consistency relation instead of
    /// first match
    #[arg(long)]
    pub strict: bool,

    /// Skip datasets with missing or malformed grid attributes instead of aborting
    #[arg(long)]
    pub skip_invalid: bool,

    /// Print the collection report as JSON
    #[arg(long)]
    pub json: bool,

    /// Sample value treated as empty space
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub background: f32,

    /// Number of threads to use for voxel extraction. Defaults to number of CPU cores.
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Enable verbose output.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    /// Conversion settings selected on the command line
    pub fn conversion_config(&self) -> ConversionConfig {
        ConversionConfig {
            pattern: self.pattern.clone(),
            strategy: if self.strict {
                GroupingStrategy::Strict
            } else {
                GroupingStrategy::Greedy
            },
            skip_invalid: self.skip_invalid,
            background: self.background,
            output: self.output.clone(),
            ..ConversionConfig::default()
        }
    }
}
