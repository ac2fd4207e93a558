mod echo;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use gleaner_core::{
    ExtractConfig, FetchConfig, JsonConfig, OutputFormat, PageInput, PageSummary, ProfileLoader, ProfileLoaderBuilder,
    Record, SiteProfile, extract_page_with_config, reconcile, records_to_json,
};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    match s.to_lowercase().as_str() {
        "json" => Ok(OutputFormat::Json),
        "jsonl" | "ndjson" => Ok(OutputFormat::Jsonl),
        _ => Err(format!("Invalid format: {}. Valid options: json, jsonl", s)),
    }
}

/// Extract listing records from web pages and reconcile them across sources
#[derive(Parser, Debug)]
#[command(name = "gleaner")]
#[command(author = "Gleaner Contributors")]
#[command(version)]
#[command(about = "Extract listing records from web pages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract records from one or more pages
    Extract(ExtractArgs),
    /// Merge duplicate records from JSON files
    Reconcile(ReconcileArgs),
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output format (json, jsonl)
    #[arg(short, long, default_value = "json", value_name = "FORMAT", value_parser = parse_format)]
    format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// URLs to fetch, local HTML files, or "-" for stdin (default: the test URLs of --site)
    #[arg(value_name = "INPUT")]
    inputs: Vec<String>,

    /// Source tag stamped on every record (overrides the site profile)
    #[arg(long, value_name = "NAME")]
    source: Option<String>,

    /// Custom site profile directory
    #[arg(long, value_name = "DIR")]
    profile_dir: Option<PathBuf>,

    /// Use the named site profile instead of matching by domain
    #[arg(long, value_name = "NAME")]
    site: Option<String>,

    /// Merge duplicates across all inputs before printing
    #[arg(long)]
    reconcile: bool,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct ReconcileArgs {
    /// JSON files, each holding an array of records
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,

    #[command(flatten)]
    output: OutputArgs,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).with_writer(std::io::stderr).init();
}

fn profile_loader(args: &ExtractArgs) -> ProfileLoader {
    match &args.profile_dir {
        Some(dir) => ProfileLoaderBuilder::new().custom_dir(dir).build(),
        None => ProfileLoader::default(),
    }
}

fn resolve_profile(loader: &mut ProfileLoader, args: &ExtractArgs, input: &PageInput) -> anyhow::Result<SiteProfile> {
    let mut profile = match (&args.site, input.url()) {
        (Some(site), _) => loader
            .load_named(site)
            .with_context(|| format!("Failed to load site profile: {}", site))?,
        (None, Some(url)) => loader
            .load_for_url(url.as_str())
            .with_context(|| format!("Failed to load site profile for {}", url))?,
        (None, None) => SiteProfile::new(),
    };

    if let Some(source) = &args.source {
        profile.source = Some(source.clone());
    }
    tracing::debug!(source = ?profile.source, cards = profile.cards.len(), "site profile resolved");
    Ok(profile)
}

/// Explicit inputs, else the `test_url` entries of the `--site` profile
fn extract_inputs(loader: &mut ProfileLoader, args: &ExtractArgs) -> anyhow::Result<Vec<String>> {
    if !args.inputs.is_empty() {
        return Ok(args.inputs.clone());
    }

    let Some(site) = &args.site else {
        anyhow::bail!("No input given. Pass URLs, files or '-', or --site with a profile that lists test_url entries");
    };
    let profile = loader
        .load_named(site)
        .with_context(|| format!("Failed to load site profile: {}", site))?;
    if profile.test_urls.is_empty() {
        anyhow::bail!("Site profile {} has no test_url entries", site);
    }
    tracing::debug!(site = %site, count = profile.test_urls.len(), "using profile test URLs");
    Ok(profile.test_urls)
}

fn write_output(output: &OutputArgs, rendered: &str, verbose: bool) -> anyhow::Result<()> {
    match &output.output {
        Some(path) => {
            fs::write(path, format!("{rendered}\n"))
                .with_context(|| format!("Failed to write to file: {}", path.display()))?;
            if verbose {
                echo::print_success(&format!("Output written to {}", path.display().bright_white()));
            }
        }
        None if rendered.is_empty() => {}
        None => println!("{}", rendered),
    }
    Ok(())
}

async fn run_extract(args: ExtractArgs, verbose: bool) -> anyhow::Result<()> {
    let fetch_config = FetchConfig {
        timeout: args.timeout,
        user_agent: args.user_agent.clone().unwrap_or_else(|| FetchConfig::default().user_agent),
    };
    let extract_config = ExtractConfig::default();
    let mut loader = profile_loader(&args);
    let inputs = extract_inputs(&mut loader, &args)?;

    let started = Instant::now();
    let mut timings = Vec::new();
    let mut records: Vec<Record> = Vec::new();
    let total = inputs.len();

    for (step, raw) in inputs.iter().enumerate() {
        let page_started = Instant::now();
        let input = PageInput::parse(raw);
        if verbose {
            echo::print_step(step + 1, total, &format!("Extracting {}", raw.bright_white()));
        }

        let profile = resolve_profile(&mut loader, &args, &input)?;
        let html = input
            .read(&fetch_config)
            .await
            .with_context(|| format!("Failed to read input: {}", raw))?;
        let page = input.page(&html).context("Failed to parse HTML")?;

        if verbose {
            echo::print_field("Size", &echo::format_size(html.len()));
            if let Some(title) = page.title() {
                echo::print_field("Title", &title);
            }
            if let Some(source) = &profile.source {
                echo::print_field("Source", source);
            }
        }

        let extraction = extract_page_with_config(&page, &profile, &extract_config);
        let summary = PageSummary::new(raw, &extraction);

        if verbose {
            echo::print_extraction_details(&summary);
        }

        records.extend(extraction.records);
        timings.push((raw.clone(), page_started.elapsed()));
    }

    let rendered = if args.reconcile {
        let before = records.len();
        let reconciled = reconcile(records);
        if verbose {
            echo::print_info(&format!("Reconciled {} records into {}", before, reconciled.len()));
        }
        records_to_json(&reconciled, &json_config(&args.output))?
    } else {
        records_to_json(&records, &json_config(&args.output))?
    };

    if verbose {
        echo::print_timing_summary(started.elapsed(), &timings);
    }

    write_output(&args.output, &rendered, verbose)
}

fn read_records(path: &Path) -> anyhow::Result<Vec<Record>> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Expected a JSON array of record objects in {}", path.display()))
}

fn run_reconcile(args: ReconcileArgs, verbose: bool) -> anyhow::Result<()> {
    let mut records = Vec::new();
    for (step, path) in args.files.iter().enumerate() {
        if verbose {
            echo::print_step(step + 1, args.files.len(), &format!("Reading {}", path.display().bright_white()));
        }
        let batch = read_records(path)?;
        if verbose {
            echo::print_field("Records", &batch.len().to_string());
        }
        records.extend(batch);
    }

    let before = records.len();
    let reconciled = reconcile(records);
    if verbose {
        let merged = reconciled.iter().filter(|r| r.is_duplicate()).count();
        echo::print_info(&format!("Reconciled {} records into {} ({} merged)", before, reconciled.len(), merged));
    }

    let rendered = records_to_json(&reconciled, &json_config(&args.output))?;
    write_output(&args.output, &rendered, verbose)
}

fn json_config(output: &OutputArgs) -> JsonConfig {
    JsonConfig { format: output.format, pretty: output.format == OutputFormat::Json }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        echo::print_banner();
        echo::print_info("Debug logging enabled");
        eprintln!();
    }

    match cli.command {
        Command::Extract(args) => run_extract(args, cli.verbose).await,
        Command::Reconcile(args) => run_reconcile(args, cli.verbose),
    }
}
