//! # samplestore
//!
//! Command-line front end: augments labelled image samples into a
//! fixed-capacity array store and inspects existing stores.
//!
//! ## Usage
//!
//! ```bash
//! # Sequential and parallel run over 10k synthetic digits, compared afterwards
//! samplestore -v ingest files.samples
//!
//! # Parallel only, small images, deterministic augmentation
//! samplestore ingest out.samples --mode parallel --resize 64x64 --seed 7
//!
//! # Inspect a store
//! samplestore info files-parallel.samples
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
