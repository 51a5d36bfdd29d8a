use anyhow::{Context, Result};
use log::info;
use samplestore::ingest::{run_ingest, IngestConfig, IngestMode, IngestReport};
use samplestore::sample::{ImageShape, SyntheticDigits};

use super::config::Config;
use super::IngestArgs;

/// MNIST test split size
const DEFAULT_SAMPLE_COUNT: usize = 10_000;

/// Resolved settings: CLI flag, then config file, then default.
struct Settings {
    ingest: IngestConfig,
    count: usize,
    shape: ImageShape,
    source_seed: u64,
}

fn parse_shape(value: &str, what: &str) -> Result<ImageShape> {
    value
        .parse::<ImageShape>()
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("Invalid {}", what))
}

fn resolve(args: IngestArgs, config: Config) -> Result<Settings> {
    let mut ingest = IngestConfig::default();

    if let Some(output) = args.output.or(config.store.output) {
        ingest.output = output;
    }
    if let Some(key) = config.store.image_key {
        ingest.image_key = key;
    }
    if let Some(key) = config.store.label_key {
        ingest.label_key = key;
    }
    if let Some(size) = args.buffer_size.or(config.store.buffer_size) {
        ingest.buffer_threshold = size;
    }
    if let Some(mode) = args.mode.map(IngestMode::from).or(config.pipeline.mode) {
        ingest.mode = mode;
    }
    ingest.worker_count = args.workers.or(config.pipeline.workers);
    ingest.seed = args.seed.or(config.pipeline.seed);

    // An explicit --resize overrides configured steps
    match args.resize {
        Some(resize) => {
            let shape = parse_shape(&resize, "--resize")?;
            ingest.resize = (shape.height, shape.width);
        }
        None => {
            if let Some(resize) = config.pipeline.resize {
                let shape = parse_shape(&resize, "pipeline.resize")?;
                ingest.resize = (shape.height, shape.width);
            }
            ingest.steps = config.pipeline.steps;
        }
    }

    let shape = match config.source.shape {
        Some(shape) => parse_shape(&shape, "source.shape")?,
        None => ImageShape::default(),
    };

    Ok(Settings {
        ingest,
        count: args.count.or(config.source.count).unwrap_or(DEFAULT_SAMPLE_COUNT),
        shape,
        source_seed: config.source.seed.unwrap_or(0),
    })
}

fn print_report(report: &IngestReport) {
    #[cfg(feature = "colorized_output")]
    {
        use console::style;

        println!("{}", style("Ingest Summary").bold().cyan());
        println!("{}", style("==============").cyan());
        for run in &report.runs {
            println!(
                "{:>10}: {} records in {:.3}s ({:.1} samples/s) -> {}",
                style(run.mode.name()).bold(),
                style(run.feed.records_forwarded).green(),
                run.feed.elapsed.as_secs_f64(),
                run.feed.throughput(),
                run.path.display()
            );
        }
        if let Some(speedup) = report.speedup() {
            println!("{:>10}: {}", style("speedup").bold(), style(format!("{:.2}x", speedup)).yellow());
        }
    }

    #[cfg(not(feature = "colorized_output"))]
    {
        println!("Ingest Summary");
        println!("==============");
        for run in &report.runs {
            println!("{}", run);
        }
        if let Some(speedup) = report.speedup() {
            println!("Speedup: {:.2}x", speedup);
        }
    }
}

/// Generate samples, augment them and write the store(s)
pub fn run(args: IngestArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let settings = resolve(args, config)?;

    info!("samplestore ingest");
    info!("==================");
    info!("Samples: {} of {}", settings.count, settings.shape);
    info!("Output: {}", settings.ingest.output.display());
    info!("Mode: {}", settings.ingest.mode);
    info!("Buffer size: {}", settings.ingest.buffer_threshold);

    let source = SyntheticDigits::new(settings.count)
        .with_shape(settings.shape)
        .with_seed(settings.source_seed);

    let report = run_ingest(&source, &settings.ingest).context("Ingest failed")?;
    print_report(&report);
    Ok(())
}
