use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tablechart::chart::{ControlChange, ControlValues, JsonRenderer};
use tablechart::csv_reader;
use tablechart::dashboard::Dashboard;
use tablechart::data::SourceData;
use tablechart::ChartOptions;

#[derive(Parser, Debug)]
#[command(name = "tablechart")]
#[command(
    about = "Build chart series from a tabular dataset and print them as JSON",
    long_about = None
)]
struct Args {
    /// Dataset file (reads stdin when omitted)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Treat the input as CSV instead of chart-data JSON
    #[arg(long)]
    csv: bool,

    /// JSON file with chart options
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Change a control and rebuild its chart, e.g. 'created-legend-selector=1'
    #[arg(long = "set", value_name = "ID=VALUE", value_parser = ControlChange::from_str)]
    changes: Vec<ControlChange>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let options = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str::<ChartOptions>(&text).context("Invalid chart options")?
        }
        None => ChartOptions::default(),
    };

    let source = load_source(&args).context("Failed to load dataset")?;
    info!(
        fields = source.fields.len(),
        rows = source.dataset.as_ref().map_or(0, Vec::len),
        "Dataset loaded"
    );

    let mut controls = ControlValues::defaults_for(&source, &options);
    let mut dashboard = Dashboard::initialize(&mut JsonRenderer, source, &controls, options);

    for change in &args.changes {
        controls.apply(change);
        if !dashboard.handle_change(&change.id, &controls) {
            warn!(id = %change.id, "Change did not update any chart");
        }
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, &dashboard.snapshot())
        .context("Failed to write charts to stdout")?;
    writeln!(handle).context("Failed to write charts to stdout")?;
    handle.flush().context("Failed to flush stdout")?;

    Ok(())
}

fn load_source(args: &Args) -> Result<SourceData> {
    if args.csv {
        let csv = match &args.input {
            Some(path) => csv_reader::read_csv(
                fs::File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
            )?,
            None => csv_reader::read_csv_from_stdin()?,
        };
        return Ok(SourceData::from_csv(csv));
    }

    let text = match &args.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read dataset from stdin")?;
            text
        }
    };
    SourceData::from_json_str(&text)
}
