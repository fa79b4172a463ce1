use anyhow::{Context, Result};
use clap::Parser;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::level_filters::LevelFilter;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use wikistream::extract::run_extraction;
use wikistream::parser::PageReader;
use wikistream::sink::Sink;
use wikistream::strategy::{Extractor, Strategy, StrategyOptions};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "wikistream", version)]
#[command(about = "Extract and convert things from Wikipedia/Wikidata XML dumps")]
struct Cli {
    /// Path to the XML dump (.xml or .xml.bz2)
    input: PathBuf,

    /// Only extract categories as TSV (page, category); the argument is the prefix, e.g. Category or Kategorie
    #[arg(short = 'c', long = "categories", value_name = "PREFIX")]
    categories: Option<String>,

    /// Only extract authority data as TSV (page, template), e.g. "Authority control" or Normdaten
    #[arg(short = 'a', long = "authority", value_name = "TEMPLATE")]
    authority: Option<String>,

    /// Decode the page text as JSON (Wikidata dumps)
    #[arg(short = 'd', long = "decode")]
    decode: bool,

    /// Number of workers (defaults to the available parallelism)
    #[arg(short, long)]
    workers: Option<NonZeroUsize>,

    /// Write output to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only emit pages whose title contains this text (no regex)
    #[arg(short = 'f', long)]
    title_filter: Option<String>,

    /// Limit number of pages to read (for testing)
    #[arg(long)]
    limit: Option<u64>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn run(cli: Cli) -> Result<()> {
    let options = StrategyOptions {
        category_marker: cli.categories,
        authority_marker: cli.authority,
        decode_wikidata: cli.decode,
    };
    let strategy = Strategy::select(&options)?;
    let extractor = Extractor::new(strategy)
        .context("Failed to build namespace filter")?
        .with_title_filter(cli.title_filter);

    let workers = match cli.workers {
        Some(n) => n,
        None => std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
    };

    let reader = PageReader::open(&cli.input)?;
    let sink = match &cli.output {
        Some(path) => Sink::create(path)?,
        None => Sink::stdout(),
    };

    let start = Instant::now();
    let (stats, _) = match cli.limit {
        Some(limit) => run_extraction(
            reader.take(limit.try_into().unwrap_or(usize::MAX)),
            &extractor,
            workers,
            sink,
        )?,
        None => run_extraction(reader, &extractor, workers, sink)?,
    };

    info!(
        duration_secs = start.elapsed().as_secs_f64(),
        pages = stats.pages_decoded,
        lines = stats.lines_written,
        failures = stats.record_failures,
        "Completed"
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    // stdout carries the extracted data, so logs go to stderr
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
