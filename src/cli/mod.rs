use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use samplestore::ingest::IngestMode;
use std::path::PathBuf;

mod config;
mod info;
mod ingest;

/// samplestore - Augment labelled image samples into a fixed-capacity array store
#[derive(Parser)]
#[command(name = "samplestore")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Which feeder paths to run.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ModeArg {
    /// Single-threaded baseline
    Sequential,
    /// Worker pool with ordered output
    Parallel,
    /// Both, each into its own store, then compare labels
    Both,
}

impl From<ModeArg> for IngestMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Sequential => IngestMode::Sequential,
            ModeArg::Parallel => IngestMode::Parallel,
            ModeArg::Both => IngestMode::Both,
        }
    }
}

/// Flags of the `ingest` command. Unset flags fall back to the config file,
/// then to built-in defaults.
#[derive(clap::Args, Debug, Default)]
pub struct IngestArgs {
    /// Output store path [default: files.samples]
    #[arg(value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Feeder paths to run [default: both]
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Number of synthetic samples to ingest [default: 10000]
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Worker threads for the parallel run [default: one per core]
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Records buffered before each flush [default: 512]
    #[arg(short, long)]
    pub buffer_size: Option<usize>,

    /// Output image size as HxW [default: 300x300]
    #[arg(short, long, value_name = "HxW")]
    pub resize: Option<String>,

    /// Seed for deterministic augmentation
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Path to TOML config file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Augment synthetic digit samples into a store
    Ingest(IngestArgs),

    /// Display the manifest and field layout of a store
    Info {
        /// Store file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Ingest(args) => ingest::run(args),
        Commands::Info { file } => info::run(file),
    }
}
