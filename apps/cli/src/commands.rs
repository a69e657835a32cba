//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use companyscout_core::{ResearchRequest, run_research};
use companyscout_providers::{OpenAiCompatClient, TavilyClient};
use companyscout_shared::{
    AppConfig, JobId, ProgressEvent, ProgressLog, init_config, load_config, load_config_from,
    resolve_api_key, validate_api_keys,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// companyscout — automated company research reports.
#[derive(Parser)]
#[command(
    name = "companyscout",
    version,
    about = "Research a company across financial, news, industry, and company tracks and compile a markdown report.",
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
    /// Research a company and print the compiled report.
    Research {
        /// Company name to research.
        company: String,

        /// Company website URL (seeds first-party documents when known).
        #[arg(long)]
        url: Option<String>,

        /// Industry the company operates in.
        #[arg(long)]
        industry: Option<String>,

        /// Headquarters location.
        #[arg(long)]
        hq: Option<String>,

        /// Config file path (defaults to ~/.companyscout/companyscout.toml).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the report to a file instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
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
        0 => "companyscout=info",
        1 => "companyscout=debug",
        _ => "companyscout=trace",
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
        Command::Research {
            company,
            url,
            industry,
            hq,
            config,
            out,
        } => cmd_research(&company, url, industry, hq, config.as_deref(), out.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

async fn cmd_research(
    company: &str,
    url: Option<String>,
    industry: Option<String>,
    hq: Option<String>,
    config_path: Option<&std::path::Path>,
    out: Option<&std::path::Path>,
) -> Result<()> {
    // Validate API keys before doing anything
    let config = match config_path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    validate_api_keys(&config)?;

    let completion = Arc::new(OpenAiCompatClient::new(
        resolve_api_key(&config.completion.api_key_env, "completion service")?,
        &config.completion.base_url,
        &config.completion.model,
    )?);
    let search = Arc::new(TavilyClient::new(
        resolve_api_key(&config.search.api_key_env, "search service")?,
        &config.search.base_url,
    )?);

    let job_id = JobId::new();
    let request = ResearchRequest {
        company: company.to_string(),
        company_url: url,
        industry,
        hq_location: hq,
        job_id: Some(job_id.clone()),
    };

    info!(company, %job_id, "starting research run");

    let log = ProgressLog::new();
    let spinner = spawn_progress_spinner(log.clone(), job_id.clone());

    let result = run_research(request, &config.defaults, completion, search, log).await;

    spinner.abort();
    let state = result?;

    match out {
        Some(path) => {
            std::fs::write(path, &state.report)
                .map_err(|e| eyre!("cannot write report to '{}': {e}", path.display()))?;
            println!("Report written to {}", path.display());
        }
        None => {
            println!("{}", state.report);
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress spinner
// ---------------------------------------------------------------------------

/// Poll the progress log and surface the latest event on a spinner.
fn spawn_progress_spinner(log: ProgressLog, job_id: JobId) -> tokio::task::JoinHandle<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message("Starting research...");

    tokio::spawn(async move {
        let mut seen = 0;
        loop {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let Some(status) = log.snapshot(&job_id) else {
                continue;
            };
            if status.events.len() > seen {
                seen = status.events.len();
                if let Some(event) = status.events.last() {
                    spinner.set_message(event_message(event));
                }
            }
            if status.status == "completed" || status.status == "failed" {
                spinner.finish_and_clear();
                break;
            }
        }
    })
}

/// One-line spinner message for a progress event.
fn event_message(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::QueryGenerating { category, .. } => {
            format!("Generating {category} queries...")
        }
        ProgressEvent::QueryGenerated {
            query, category, ..
        } => format!("[{category}] query: {query}"),
        ProgressEvent::QueriesComplete {
            count, category, ..
        } => format!("[{category}] {count} queries ready"),
        ProgressEvent::SearchStarted {
            total_queries,
            category,
        } => format!("[{category}] searching {total_queries} queries..."),
        ProgressEvent::QueryError {
            query, category, ..
        } => format!("[{category}] search failed for '{query}'"),
        ProgressEvent::SearchComplete {
            total_documents,
            category,
            ..
        } => format!("[{category}] {total_documents} documents found"),
        ProgressEvent::AnalysisComplete { category, count } => {
            format!("[{category}] research complete ({count} documents)")
        }
        ProgressEvent::Curation {
            category, total, ..
        } => format!("[{category}] curating {total} documents..."),
        ProgressEvent::BriefingStart {
            category,
            total_docs,
        } => format!("[{category}] writing briefing from {total_docs} documents..."),
        ProgressEvent::BriefingComplete { category, .. } => {
            format!("[{category}] briefing complete")
        }
        ProgressEvent::ReportCompilation { message } => message.clone(),
        ProgressEvent::ReportChunk { .. } => "Polishing final report...".into(),
        ProgressEvent::Error { error, .. } => format!("Error: {error}"),
    }
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
