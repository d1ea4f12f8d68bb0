use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use weft::ranges::{self, Range};
use weft::recording::Blob;
use weft::{ExportEvent, ExportPipeline, WeftConfig};

#[derive(Parser)]
#[command(name = "weft")]
#[command(author, version, about = "Cut time ranges out of a recording and join them")]
struct Cli {
    /// Path to a JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Export the given ranges of a recording, in the order given
    Export(ExportArgs),
    /// Print the normalized form of a set of ranges as JSON
    Normalize(RangeArgs),
}

#[derive(Args)]
struct RangeArgs {
    /// A range as START:END; an empty bound is unbounded
    #[arg(long = "range", value_parser = parse_range_arg, allow_hyphen_values = true)]
    ranges: Vec<Range>,

    /// File with one `start end` pair per line
    #[arg(long = "ranges")]
    ranges_file: Option<PathBuf>,

    /// Unit of the range values
    #[arg(long, value_enum, default_value_t = Unit::S)]
    unit: Unit,
}

#[derive(Args)]
struct ExportArgs {
    /// Source recording
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the trimmed recording
    #[arg(short, long)]
    output: PathBuf,

    #[command(flatten)]
    ranges: RangeArgs,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Unit {
    S,
    Ms,
}

/// `START:END` with either side optionally empty
fn parse_range_arg(value: &str) -> Result<Range, String> {
    let (start, end) = value
        .split_once(':')
        .ok_or_else(|| format!("expected START:END, got '{}'", value))?;

    let bound = |text: &str, unbounded: f64| -> Result<f64, String> {
        let text = text.trim();
        if text.is_empty() {
            Ok(unbounded)
        } else {
            text.parse::<f64>()
                .map_err(|e| format!("invalid bound '{}': {}", text, e))
        }
    };

    ranges::make(bound(start, f64::NEG_INFINITY)?, bound(end, f64::INFINITY)?)
        .map_err(|e| e.to_string())
}

/// Ranges in seconds, flags first, then the file, caller order kept
fn collect_ranges(args: &RangeArgs) -> anyhow::Result<Vec<Range>> {
    let mut all = args.ranges.clone();
    if let Some(path) = &args.ranges_file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read ranges '{}'", path.display()))?;
        all.extend(ranges::parse_ranges_text(&text));
    }

    if args.unit == Unit::Ms {
        all = ranges::transform(&all, |value, _, _| value / 1000.0)?;
    }
    Ok(all)
}

fn load_config(path: Option<&Path>) -> anyhow::Result<WeftConfig> {
    let config = match path {
        Some(path) => WeftConfig::load(path)?,
        None => WeftConfig::default(),
    };
    Ok(config.apply_env())
}

async fn cmd_export(config: &WeftConfig, args: ExportArgs) -> anyhow::Result<()> {
    let ranges = collect_ranges(&args.ranges)?;
    if ranges.is_empty() {
        bail!("no ranges given; use --range or --ranges");
    }

    let data = tokio::fs::read(&args.input)
        .await
        .with_context(|| format!("read input '{}'", args.input.display()))?;

    let pipeline = ExportPipeline::from_config(config);
    let _progress = pipeline.subscribe(|event| match event {
        ExportEvent::Progress { ratio } => tracing::info!("{:>3.0}%", ratio * 100.0),
        ExportEvent::Output { message, .. } => tracing::debug!("{}", message),
        _ => {}
    });

    let output = pipeline.slice(Blob::new(data), &ranges).await?;

    tokio::fs::write(&args.output, output.data())
        .await
        .with_context(|| format!("write output '{}'", args.output.display()))?;

    tracing::info!(
        "Wrote {} range(s) to {} ({} bytes)",
        ranges.len(),
        args.output.display(),
        output.len()
    );
    Ok(())
}

fn cmd_normalize(args: RangeArgs) -> anyhow::Result<()> {
    let merged = ranges::merge_many(&collect_ranges(&args)?);
    println!("{}", serde_json::to_string(&merged)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let filter = if cli.verbose {
        "weft=debug"
    } else {
        config.log_filter.as_str()
    };
    weft::init_tracing(filter);

    match cli.cmd {
        Command::Export(args) => cmd_export(&config, args).await,
        Command::Normalize(args) => cmd_normalize(args),
    }
}
