use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::{num::NonZeroUsize, path::PathBuf};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};
use uuidstore::{
    generate_from_path, run_search, CliOverrides, GenerationSummary, SearchReport, StoreConfig,
    StoreError,
};

const RESULTS_BANNER: &str = "========================== RESULTS ============================";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// (Re)build the store from the input file before searching
    #[arg(short, long)]
    generate: bool,

    /// Newline-delimited JSON input (default: events.json)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Binary store file (default: db.bin)
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of search threads
    #[arg(short = 'j', long)]
    threads: Option<NonZeroUsize>,

    /// Capacity of the generation queue
    #[arg(short, long)]
    queue_capacity: Option<NonZeroUsize>,

    /// Print one JSON object per result instead of text
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log level used when neither RUST_LOG nor -v is given
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Print the resolved configuration as YAML and exit
    #[arg(long)]
    print_config: bool,

    /// Space separated list of UUIDs to search for
    #[arg(required_unless_present_any = ["generate", "print_config"])]
    uuids: Vec<String>,
}

fn main() -> Result<()> {
    run()
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = StoreConfig::load_from(cli.config.as_deref())
        .map_err(|e| StoreError::config_error(e.to_string()))?
        .merge_with_cli(CliOverrides {
            input_path: cli.input,
            store_path: cli.store,
            queue_capacity: cli.queue_capacity,
            thread_count: cli.threads,
            log_level: cli.log_level,
        });
    init_logging(cli.verbose, &config.log_level);
    debug!("Resolved configuration: {:?}", config);

    if cli.print_config {
        print!("{}", config.to_yaml()?);
        return Ok(());
    }

    if cli.generate {
        let summary = generate_from_path(&config)?;
        print_generation_summary(&config, &summary);
    }

    if cli.uuids.is_empty() {
        return Ok(());
    }

    let report = run_search(&config, &cli.uuids)?;
    if cli.json {
        print_json_results(&report)?;
    } else {
        print_search_results(&report);
    }
    eprintln!(
        "Reading {} took {}, searching took {}",
        config.store_path.display(),
        humantime::format_duration(report.build_elapsed),
        humantime::format_duration(report.search_elapsed)
    );
    Ok(())
}

/// RUST_LOG wins, then the `-v` count, then the configured level
fn init_logging(verbosity: u8, configured_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbosity {
        0 => EnvFilter::try_new(configured_level).unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_generation_summary(config: &StoreConfig, summary: &GenerationSummary) {
    eprintln!(
        "Wrote {} records ({} pairs) to {} in {}",
        summary.records_written,
        summary.pairs_read,
        config.store_path.display().to_string().blue(),
        humantime::format_duration(summary.elapsed)
    );
}

fn print_search_results(report: &SearchReport) {
    println!("{}", RESULTS_BANNER);
    for result in &report.results {
        let line = result.to_string();
        if result.is_found() {
            println!("{}", line.green());
        } else {
            println!("{}", line.yellow());
        }
    }
    println!(
        "\nFound {} of {} identifiers",
        report.found(),
        report.results.len()
    );
}

fn print_json_results(report: &SearchReport) -> Result<()> {
    for result in &report.results {
        println!("{}", serde_json::to_string(result)?);
    }
    Ok(())
}
