//! Entry point for the gridfold application.
//! Handles CLI parsing and logging setup, then either lists container contents
//! or groups datasets into collections and exports their volumes.

use clap::Parser;
use gridfold::cli::Args;
use gridfold::collection::{collections_json, collections_report};
use gridfold::metadata::describe_container;
use gridfold::netcdf_io::compile_pattern;
use gridfold::parallel::ParallelConfig;
use gridfold::pipeline::Pipeline;
use log::info;

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments
    let args = Args::parse();
    init_logging(args.verbose);

    ParallelConfig::new(args.threads).setup_global_pool()?;

    if args.list {
        let pattern = compile_pattern(&args.pattern)?;
        for path in &args.input {
            let file = netcdf::open(path)?;
            println!("{}:", path.display());
            print!("{}", describe_container(&file, &pattern, args.detail)?);
        }
        return Ok(());
    }

    let pipeline = Pipeline::open(&args.input, args.conversion_config())?;
    let summary = pipeline.run()?;

    if args.json {
        let report = collections_json(&summary.collections);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", collections_report(&summary.collections));
    }

    if summary.outputs.is_empty() {
        info!("No output requested, nothing written");
    }
    for path in &summary.outputs {
        println!("✅ Saved volume to {}", path.display());
    }

    Ok(())
}
