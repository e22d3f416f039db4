//! CLI binary for marketmetric.
//!
//! A thin shim over the library crate: maps flags and environment variables
//! to `AnalysisConfig`, then either serves the HTTP API or analyses one PDF.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use marketmetric::config::{DEFAULT_BASE_URL, DEFAULT_EXTRACT_TIMEOUT_SECS, DEFAULT_MODEL};
use marketmetric::pipeline::{extract, prompt};
use marketmetric::server::{self, AppState};
use marketmetric::storage::DEFAULT_STORAGE_DIR;
use marketmetric::{
    AnalysisConfig, AnalysisMode, AnalysisOutcome, Analyzer, Criterion, GroqClient,
    LocalStorage, ParsePolicy, ReportResults, Storage,
};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Start the HTTP API on 0.0.0.0:3000
  marketmetric serve

  # Score one report (ten yes/no criteria)
  marketmetric analyze --mode scorecard report.pdf

  # Five-section markdown summary, as JSON
  marketmetric analyze --json report.pdf > summary.json

  # Check what text the extractor sees (no API key needed)
  marketmetric inspect report.pdf

ENVIRONMENT VARIABLES:
  GROQ_API_KEY                 API key for the chat-completion provider
  GROQ_API_MODEL               Model ID (default: deepseek-r1-distill-llama-70b)
  GROQ_BASE_URL                OpenAI-compatible base URL
  MAX_TOKENS                   Completion token budget
  USE_LOCAL_FALLBACK           Analyse the built-in sample report instead of uploads
  MARKETMETRIC_MODE            scorecard | summary
  MARKETMETRIC_PARSE_POLICY    strict | lenient
  MARKETMETRIC_STORAGE_DIR     Bucket directory for uploads
  MARKETMETRIC_HOST            Bind address for `serve`
  MARKETMETRIC_PORT            Port for `serve`
  MARKETMETRIC_EXTRACT_TIMEOUT PDF text extraction timeout in seconds

  A .env file in the working directory is loaded if present.
"#;

/// Analyse PDF market-research reports with an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "marketmetric",
    version,
    about = "Score or summarise PDF market-research reports with an LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "MARKETMETRIC_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "MARKETMETRIC_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API.
    Serve {
        /// Address to bind.
        #[arg(long, env = "MARKETMETRIC_HOST", default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on.
        #[arg(short, long, env = "MARKETMETRIC_PORT", default_value_t = 3000)]
        port: u16,

        /// Bucket directory for uploaded reports.
        #[arg(long, env = "MARKETMETRIC_STORAGE_DIR", default_value = DEFAULT_STORAGE_DIR)]
        storage_dir: PathBuf,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Analyse a single local PDF and print the result.
    Analyze {
        /// Path to the PDF report.
        input: PathBuf,

        /// Print the full JSON outcome instead of a readable rendering.
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Extract text from a PDF and report what the prompt builder would see.
    Inspect {
        /// Path to the PDF report.
        input: PathBuf,

        /// Print the extracted text.
        #[arg(long)]
        text: bool,

        /// PDF text extraction timeout in seconds.
        #[arg(
            long,
            env = "MARKETMETRIC_EXTRACT_TIMEOUT",
            default_value_t = DEFAULT_EXTRACT_TIMEOUT_SECS
        )]
        extract_timeout: u64,
    },
}

/// Flags shared by every command that calls the LLM.
#[derive(Args, Debug)]
struct AnalysisArgs {
    /// API key for the chat-completion provider.
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model ID.
    #[arg(long, env = "GROQ_API_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// OpenAI-compatible base URL; `/chat/completions` is appended.
    #[arg(long, env = "GROQ_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Completion token budget (default: 300 scorecard, 4096 summary).
    #[arg(long, env = "MAX_TOKENS")]
    max_tokens: Option<u32>,

    /// Analyse the built-in sample report instead of the given file.
    #[arg(long, env = "USE_LOCAL_FALLBACK")]
    local_fallback: bool,

    /// Analysis to produce: scorecard or summary.
    #[arg(long, env = "MARKETMETRIC_MODE", default_value = "summary")]
    mode: AnalysisMode,

    /// What to do when the model does not give ten answers: strict or lenient.
    #[arg(long, env = "MARKETMETRIC_PARSE_POLICY", default_value = "lenient")]
    parse_policy: ParsePolicy,

    /// PDF text extraction timeout in seconds.
    #[arg(
        long,
        env = "MARKETMETRIC_EXTRACT_TIMEOUT",
        default_value_t = DEFAULT_EXTRACT_TIMEOUT_SECS
    )]
    extract_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The one-shot commands stay quiet unless asked; the server logs requests.
    let default_filter = match (&cli.command, cli.quiet, cli.verbose) {
        (_, _, true) => "debug",
        (_, true, _) => "error",
        (Command::Serve { .. }, _, _) => "info,tower_http=info",
        _ => "warn",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve {
            host,
            port,
            storage_dir,
            analysis,
        } => run_serve(host, port, storage_dir, analysis).await,
        Command::Analyze {
            input,
            json,
            analysis,
        } => run_analyze(input, json, cli.quiet, analysis).await,
        Command::Inspect {
            input,
            text,
            extract_timeout,
        } => run_inspect(input, text, extract_timeout).await,
    }
}

/// Map CLI args to `AnalysisConfig`.
fn build_config(args: &AnalysisArgs) -> Result<AnalysisConfig> {
    let mut builder = AnalysisConfig::builder()
        .mode(args.mode)
        .parse_policy(args.parse_policy)
        .model(args.model.clone())
        .base_url(args.base_url.clone())
        .use_local_fallback(args.local_fallback)
        .extract_timeout_secs(args.extract_timeout);

    if let Some(ref key) = args.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(n) = args.max_tokens {
        builder = builder.max_tokens(n);
    }

    builder.build().context("Invalid configuration")
}

async fn run_serve(
    host: String,
    port: u16,
    storage_dir: PathBuf,
    args: AnalysisArgs,
) -> Result<()> {
    let config = build_config(&args)?;
    // Refuse to start without a credential rather than failing every request.
    let llm = GroqClient::new(&config).context("Cannot start server")?;

    let storage = LocalStorage::new(&storage_dir);
    if storage
        .ensure_bucket()
        .await
        .with_context(|| format!("Failed to create storage bucket {}", storage_dir.display()))?
    {
        info!("Created storage bucket {}", storage_dir.display());
    }

    info!(
        "Mode: {}, parse policy: {:?}, local fallback: {}",
        config.mode, config.parse_policy, config.use_local_fallback
    );
    let analyzer = Analyzer::new(config, Arc::new(storage), Arc::new(llm));

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("Invalid bind address {host}:{port}"))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    server::serve(listener, AppState::new(analyzer))
        .await
        .context("Server error")
}

async fn run_analyze(input: PathBuf, json: bool, quiet: bool, args: AnalysisArgs) -> Result<()> {
    let config = build_config(&args)?;
    let llm = GroqClient::new(&config)?;

    let bytes = if config.use_local_fallback {
        Vec::new()
    } else {
        tokio::fs::read(&input)
            .await
            .with_context(|| format!("Failed to read {}", input.display()))?
    };

    let mode = config.mode;
    let storage = LocalStorage::new(DEFAULT_STORAGE_DIR);
    let analyzer = Analyzer::new(config, Arc::new(storage), Arc::new(llm));

    let spinner = if quiet || json {
        ProgressBar::hidden()
    } else {
        new_spinner(&format!("Analysing {} ({mode})…", input.display()))
    };
    let start = Instant::now();
    let result = analyzer.analyze_bytes(bytes).await;
    spinner.finish_and_clear();
    let outcome = result.context("Analysis failed")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("Failed to serialise output")?
        );
        return Ok(());
    }

    render_outcome(&outcome)?;
    if !quiet {
        eprintln!(
            "{}",
            dim(&format!(
                "{} via {} in {:.1}s",
                mode,
                analyzer.model(),
                start.elapsed().as_secs_f64()
            ))
        );
        if outcome.provenance.is_degraded() {
            eprintln!(
                "{} degraded result: {}",
                yellow("⚠"),
                serde_json::to_string(&outcome.provenance).unwrap_or_default()
            );
        }
    }
    Ok(())
}

fn render_outcome(outcome: &AnalysisOutcome) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match &outcome.results {
        ReportResults::Scorecard(card) => {
            for criterion in Criterion::ALL {
                let mark = if card.get(criterion) {
                    green("✓")
                } else {
                    red("✗")
                };
                writeln!(handle, "  {} {}", mark, criterion.label())?;
            }
            writeln!(
                handle,
                "\n  {} {}/10",
                bold("Score:"),
                bold(&card.total_score().to_string())
            )?;
        }
        ReportResults::Summary(summary) => {
            handle
                .write_all(summary.summary.as_bytes())
                .context("Failed to write to stdout")?;
        }
    }
    Ok(())
}

async fn run_inspect(input: PathBuf, print_text: bool, extract_timeout: u64) -> Result<()> {
    let bytes = tokio::fs::read(&input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let size = bytes.len();

    let start = Instant::now();
    let extracted = extract::extract(bytes, false, Duration::from_secs(extract_timeout)).await;
    let elapsed = start.elapsed();

    let text = extracted.text();
    let filtered = prompt::filter_relevant(text);

    println!("File:           {}", input.display());
    println!("Size:           {} bytes", size);
    match extracted.fallback_reason() {
        None => println!("Text:           {}", green("extracted")),
        Some(reason) => println!(
            "Text:           {} ({})",
            yellow("sample report"),
            serde_json::to_string(&reason).unwrap_or_default().trim_matches('"')
        ),
    }
    println!("Characters:     {}", text.chars().count());
    println!(
        "Scorecard uses: {} chars",
        text.chars().count().min(prompt::SCORECARD_TEXT_LIMIT)
    );
    println!(
        "Summary uses:   {} chars after keyword filter",
        filtered.chars().count().min(prompt::SUMMARY_TEXT_LIMIT)
    );
    println!("Extracted in:   {:.2}s", elapsed.as_secs_f64());

    if print_text {
        println!("\n{}", text.trim());
    }
    Ok(())
}

fn new_spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
    bar.set_style(style);
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}
