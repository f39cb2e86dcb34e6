use anyhow::{Context, Result};
use clap::Parser;
use sensorgraph::{pipeline, Config, TimeRange};
use std::{
    fs::{self, File},
    io::{self, BufReader, Write},
    path::PathBuf,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sensorgraph")]
#[command(about = "Turn a sensor CSV feed into gap-aware, synchronized chart data")]
struct Args {
    /// CSV file with a `timestamp` column and one column per metric
    input: PathBuf,

    /// JSON config file (defaults to the six built-in sensor metrics)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Gap threshold in milliseconds, overrides the config
    #[arg(long)]
    gap_threshold: Option<i64>,

    /// Epoch offset added to raw timestamps, overrides the config
    #[arg(long)]
    epoch_offset: Option<i64>,

    /// Only keep points at or after this time (ms since the Unix epoch)
    #[arg(long)]
    from: Option<i64>,

    /// Only keep points at or before this time (ms since the Unix epoch)
    #[arg(long)]
    to: Option<i64>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(gap_threshold) = args.gap_threshold {
        config.time.gap_threshold = gap_threshold;
    }
    if let Some(epoch_offset) = args.epoch_offset {
        config.time.epoch_offset = epoch_offset;
    }

    let file = File::open(&args.input)
        .with_context(|| format!("opening {}", args.input.display()))?;
    let range = TimeRange {
        start: args.from,
        end: args.to,
    };
    let output = pipeline::run(BufReader::new(file), &config, range)
        .with_context(|| format!("processing {}", args.input.display()))?;

    let json = output.dashboard.to_json(args.pretty)?;
    match &args.output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("writing {}", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", json)?;
        }
    }
    Ok(())
}
