use clap::{Parser, Subcommand};

mod analyze;
mod log;
mod logging;
mod model;
mod render;
mod track;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "endpoint-stats")]
#[command(about = "Per-endpoint response time statistics from router logs", long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate a logfmt router log and print one summary table per endpoint.
    Report {
        /// Log file to read, or `-` for stdin.
        #[arg(long)]
        log: String,

        /// JSON file overriding the endpoint pattern and tracked signatures.
        #[arg(long)]
        config: Option<String>,

        #[arg(long, value_enum, default_value_t = render::Format::Table)]
        format: render::Format,

        /// Write the report here instead of stdout.
        #[arg(short = 'o', long)]
        out: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level);

    match cli.cmd {
        Commands::Report {
            log,
            config,
            format,
            out,
        } => {
            let text = run_report(&log, config.as_deref(), format)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, text)?;
                    println!("Wrote {}", path);
                }
                None => print!("{}", text),
            }
        }
    }

    Ok(())
}

/// Config, ingest, analyze, render: the whole report pipeline.
fn run_report(log: &str, config: Option<&str>, format: render::Format) -> Result<String> {
    // 1) Load + validate tracking config.
    let tracking_spec = match config {
        Some(path) => track::TrackingSpec::from_file(path)?,
        None => track::TrackingSpec::default(),
    };
    let tracking = tracking_spec.validate_and_build()?;
    tracing::debug!(signatures = tracking.signatures.len(), "tracking config loaded");

    // 2) Stream records into the store.
    let mut store = aggregate_log(log, tracking)?;

    // 3) Analyze once input is exhausted.
    store.calculate();

    // 4) Render.
    let report = store.report()?;
    render::render_report(&report, format)
}

fn aggregate_log(log: &str, tracking: track::Tracking) -> Result<model::AggregationStore> {
    let mut store = model::AggregationStore::new(tracking);
    let reader = log::open_source(log)?;
    let summary = log::read_records(reader, log, |record| {
        store.track(&record);
    })?;

    let counters = store.counters();
    tracing::info!(
        lines = summary.lines,
        records = summary.records,
        seen = counters.seen,
        tracked = counters.tracked,
        unmatched = counters.unmatched,
        untracked = counters.untracked,
        rejected = counters.rejected,
        "finished reading {}",
        log
    );

    Ok(store)
}
