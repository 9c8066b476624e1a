use anyhow::{Context, Result};
use api_docs_core::analyzer::extract::{parse_module_source, Extractor};
use api_docs_core::analyzer::metadata::{DocInputs, RouteModule};
use api_docs_core::cache::{fingerprint, IncrementalCache};
use api_docs_core::config::ExtractionConfig;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Extract API documentation data from route and error modules", long_about = None)]
struct Cli {
    /// JSON extraction config; every field is optional
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract route definitions from every module in a directory
    Routes(RoutesArgs),
    /// Extract the error table from an error module
    Errors { file: PathBuf },
    /// Extract the named exports of a module (validators, metrics context)
    Exports { file: PathBuf },
    /// Assemble the complete documentation data
    Generate(GenerateArgs),
    /// Parse JavaScript from STDIN and print the syntax tree as JSON
    Parse(ParseArgs),
}

#[derive(Args, Debug)]
struct RoutesArgs {
    dir: PathBuf,
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[arg(long)]
    routes: PathBuf,
    #[arg(long)]
    validators: PathBuf,
    #[arg(long)]
    metrics_context: PathBuf,
    #[arg(long)]
    errors: PathBuf,
    /// Write to this file instead of STDOUT
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
struct ParseArgs {
    /// File name used in error messages
    #[arg(long)]
    filename: Option<String>,
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).with_target(false).init();
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ExtractionConfig::load(path).context("loading extraction config")?,
        None => ExtractionConfig::default(),
    };
    let fingerprint = fingerprint(&config);
    let extractor = Extractor::new(config)?;

    match cli.command {
        Commands::Routes(args) => {
            let cache = open_cache(args.cache_dir.as_deref(), &fingerprint)?;
            let modules = extractor
                .index_routes(&args.dir, cache.as_ref())
                .with_context(|| format!("extracting routes from {}", args.dir.display()))?;
            report_cache(cache.as_ref());
            write_json(&modules, None)
        }
        Commands::Errors { file } => {
            let table = extractor.errors_from_file(&file)?;
            write_json(&table, None)
        }
        Commands::Exports { file } => {
            let exports = extractor.exports_from_file(&file)?;
            write_json(&exports, None)
        }
        Commands::Generate(args) => {
            let cache = open_cache(args.cache_dir.as_deref(), &fingerprint)?;
            let inputs = DocInputs {
                routes_dir: args.routes,
                validators: args.validators,
                metrics_context: args.metrics_context,
                errors: args.errors,
            };
            let docs = extractor.generate(&inputs, cache.as_ref())?;
            report_cache(cache.as_ref());
            write_json(&docs, args.output.as_deref())
        }
        Commands::Parse(args) => {
            let mut source = String::new();
            io::stdin().read_to_string(&mut source).context("reading STDIN")?;
            let filename = args.filename.unwrap_or_else(|| "input.js".to_string());
            let program = parse_module_source(&source, Path::new(&filename))?;
            write_json(&program, None)
        }
    }
}

fn open_cache(dir: Option<&Path>, fingerprint: &str) -> Result<Option<IncrementalCache<RouteModule>>> {
    dir.map(|dir| IncrementalCache::new(dir, fingerprint).context("opening cache directory"))
        .transpose()
}

fn report_cache(cache: Option<&IncrementalCache<RouteModule>>) {
    if let Some(cache) = cache {
        let stats = cache.stats();
        info!(hits = stats.hits, misses = stats.misses, dir = %stats.cache_dir, "route cache");
    }
}

/// Pretty JSON to `output`, or STDOUT. Nothing is written unless
/// serialisation succeeds.
fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => std::fs::write(path, json + "\n").with_context(|| format!("writing {}", path.display()))?,
        None => println!("{}", json),
    }
    Ok(())
}
