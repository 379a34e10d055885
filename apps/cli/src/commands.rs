//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use listscribe_core::dataset::{csv_to_json, json_to_csv, load_dataset};
use listscribe_core::{Outcome, ProcessorContext, ProgressReporter, RunSummary, scheduler};
use listscribe_crawler::{FetchOptions, Fetcher};
use listscribe_genai::GeminiClient;
use listscribe_shared::{
    AppConfig, PipelineConfig, TaskKind, init_config, load_config, resolve_api_key,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Listscribe — AI content enrichment for organization directories.
#[derive(Parser)]
#[command(
    name = "listscribe",
    version,
    about = "Generate AI descriptions and excerpts for organization directory datasets.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Enrich every record in a dataset and write it back in place.
    Run {
        /// JSON dataset file to enrich.
        dataset: PathBuf,

        /// What to generate: description or excerpt.
        #[arg(short, long, default_value = "description")]
        task: String,

        /// Backing-file output directory (defaults to config value).
        #[arg(short, long)]
        out: Option<String>,

        /// Records processed concurrently (defaults to config value).
        #[arg(short, long)]
        window: Option<usize>,

        /// Per-request fetch timeout in seconds (defaults to config value).
        #[arg(long)]
        timeout: Option<u64>,

        /// Maximum AI-prioritized links per site (defaults to config value).
        #[arg(long)]
        max_links: Option<usize>,
    },

    /// Convert datasets between CSV and JSON.
    Convert {
        /// Conversion direction.
        #[command(subcommand)]
        action: ConvertAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Dataset conversion subcommands.
#[derive(Subcommand)]
pub(crate) enum ConvertAction {
    /// Convert a CSV export to the JSON dataset format.
    CsvToJson {
        /// Input CSV file.
        input: PathBuf,

        /// Output JSON file (defaults to the input with a .json extension).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Convert an enriched JSON dataset back to CSV.
    JsonToCsv {
        /// Input JSON file.
        input: PathBuf,

        /// Output CSV file (defaults to the input with a .csv extension).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "listscribe=info",
        1 => "listscribe=debug",
        _ => "listscribe=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            dataset,
            task,
            out,
            window,
            timeout,
            max_links,
        } => cmd_run(&dataset, &task, out.as_deref(), window, timeout, max_links).await,
        Command::Convert { action } => match action {
            ConvertAction::CsvToJson { input, output } => {
                cmd_convert_csv_to_json(&input, output).await
            }
            ConvertAction::JsonToCsv { input, output } => {
                cmd_convert_json_to_csv(&input, output).await
            }
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Enrichment run
// ---------------------------------------------------------------------------

async fn cmd_run(
    dataset_path: &PathBuf,
    task: &str,
    out: Option<&str>,
    window: Option<usize>,
    timeout: Option<u64>,
    max_links: Option<usize>,
) -> Result<()> {
    // Validate API key before doing anything
    let config = load_config()?;
    let api_key = resolve_api_key(&config)?;

    let task: TaskKind = task.parse().map_err(|e: String| eyre!(e))?;

    // CLI flags override config file values
    let mut pipeline = PipelineConfig::from(&config);
    if let Some(window) = window {
        pipeline.window_size = window.max(1);
    }
    if let Some(secs) = timeout {
        pipeline.fetch_timeout = Duration::from_secs(secs);
    }
    if let Some(max_links) = max_links {
        pipeline.max_priority_links = max_links;
    }

    let output_dir = PathBuf::from(
        out.map(String::from)
            .unwrap_or_else(|| config.defaults.output_dir.clone()),
    );

    let records = load_dataset(dataset_path)?;
    let model = GeminiClient::new(api_key, config.gemini.model.clone())
        .with_base_url(config.gemini.base_url.clone());

    info!(
        dataset = %dataset_path.display(),
        records = records.len(),
        task = %task,
        window = pipeline.window_size,
        model = model.model(),
        "starting enrichment run"
    );

    let fetcher = Fetcher::new(&FetchOptions {
        tls: pipeline.tls,
        timeout: pipeline.fetch_timeout,
        plain_http_hosts: pipeline.plain_http_hosts.clone(),
    })?;

    let ctx = Arc::new(ProcessorContext {
        fetcher,
        model: Arc::new(model),
        config: pipeline,
        task,
        output_dir,
    });

    let reporter = Arc::new(CliProgress::new());
    let summary = scheduler::run(ctx, records, dataset_path, reporter.clone()).await?;
    reporter.finish();

    print_summary(task, &summary);

    Ok(())
}

fn print_summary(task: TaskKind, summary: &RunSummary) {
    println!();
    println!("  Enrichment run complete!");
    println!("  Task:      {task}");
    println!("  Records:   {}", summary.total);
    println!("  Succeeded: {}", summary.succeeded);
    println!("  Cached:    {}", summary.cached);
    println!("  Failed:    {}", summary.failed());
    println!(
        "  Time:      {:.1}s",
        summary.elapsed().num_milliseconds() as f64 / 1000.0
    );
    println!();

    if !summary.failures.is_empty() {
        println!("  Failed records:");
        for (i, failure) in summary.failures.iter().enumerate() {
            println!(
                "  {}. {} ({})",
                i + 1,
                failure.listing_title,
                failure.website.as_deref().unwrap_or("no website")
            );
            println!("     Error: {}", failure.error);
        }
        println!();
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn record_started(&self, title: &str, position: usize, total: usize) {
        self.spinner
            .set_message(format!("Processing [{}/{total}] {title}", position + 1));
    }

    fn record_finished(&self, title: &str, outcome: Outcome) {
        let label = match outcome {
            Outcome::Cached => "already processed",
            Outcome::Generated => "completed",
        };
        self.spinner.println(format!("  {label}: {title}"));
    }

    fn record_failed(&self, title: &str, error: &str) {
        self.spinner.println(format!("  failed: {title}: {error}"));
    }
}

// ---------------------------------------------------------------------------
// Conversion and config commands
// ---------------------------------------------------------------------------

async fn cmd_convert_csv_to_json(input: &PathBuf, output: Option<PathBuf>) -> Result<()> {
    let output = output.unwrap_or_else(|| input.with_extension("json"));
    let rows = csv_to_json(input, &output)?;
    println!("Converted {rows} rows to {}", output.display());
    Ok(())
}

async fn cmd_convert_json_to_csv(input: &PathBuf, output: Option<PathBuf>) -> Result<()> {
    let output = output.unwrap_or_else(|| input.with_extension("csv"));
    let rows = json_to_csv(input, &output)?;
    println!("Converted {rows} rows to {}", output.display());
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
