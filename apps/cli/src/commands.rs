//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Local;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use sourcemark_annotate::{AnnotateReport, Annotator};
use sourcemark_calibre::{ConvertJob, SmtpSettings};
use sourcemark_shared::{AnnotateConfig, digest_file_name, init_config, load_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// sourcemark — news digests with scannable source links.
#[derive(Parser)]
#[command(
    name = "sourcemark",
    version,
    about = "Build a news digest EPUB, stamp each article with a QR source link, and deliver it.",
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
    /// Build a digest from a recipe, annotate it, and optionally mail it.
    Run {
        /// Calibre recipe to convert (defaults to the configured recipe).
        #[arg(short, long)]
        recipe: Option<PathBuf>,

        /// Output directory for the digest (defaults to the configured one).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Digest file name prefix (defaults to the configured one).
        #[arg(short, long)]
        prefix: Option<String>,

        /// Mail the finished digest even if config says otherwise.
        #[arg(long)]
        send_email: bool,
    },

    /// Annotate an existing EPUB in place, without converting or mailing.
    Annotate {
        /// EPUB file to annotate.
        epub: PathBuf,
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
        0 => "sourcemark=info",
        1 => "sourcemark=debug",
        _ => "sourcemark=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
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
            recipe,
            out,
            prefix,
            send_email,
        } => cmd_run(recipe, out, prefix, send_email).await,
        Command::Annotate { epub } => cmd_annotate(&epub).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(
    recipe: Option<PathBuf>,
    out: Option<PathBuf>,
    prefix: Option<String>,
    send_email_flag: bool,
) -> Result<()> {
    let start = Instant::now();
    let config = load_config()?;

    let recipe = recipe.unwrap_or_else(|| PathBuf::from(&config.defaults.recipe));
    let out_dir = out.unwrap_or_else(|| PathBuf::from(&config.defaults.output_dir));
    let prefix = prefix.unwrap_or_else(|| config.defaults.file_prefix.clone());
    let send_email = send_email_flag || config.defaults.send_email || env_send_email();

    let file_name = digest_file_name(&prefix, Local::now());
    let output = out_dir.join(&file_name);

    if let Ok(version) = sourcemark_calibre::ebook_convert_version().await {
        info!(%version, "found converter");
    }
    info!(file = %output.display(), send_email, "starting digest run");

    let spinner = spinner();

    spinner.set_message(format!("Converting {}", recipe.display()));
    sourcemark_calibre::build_epub(&ConvertJob {
        recipe,
        output: output.clone(),
    })
    .await?;

    spinner.set_message("Annotating articles");
    let annotator = Annotator::new(AnnotateConfig::from(&config));
    let report = annotator.annotate(&output)?;

    if send_email {
        spinner.set_message("Sending email");
        let smtp = SmtpSettings::from_env()?;
        smtp.send(&output).await?;
    }

    spinner.finish_and_clear();
    print_summary(&output, &report, send_email, start.elapsed());
    Ok(())
}

async fn cmd_annotate(epub: &Path) -> Result<()> {
    if !epub.exists() {
        return Err(eyre!("no such file: {}", epub.display()));
    }

    let start = Instant::now();
    let config = load_config()?;
    let report = Annotator::new(AnnotateConfig::from(&config)).annotate(epub)?;

    print_summary(epub, &report, false, start.elapsed());
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("wrote {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `SEND_EMAIL=true` in the environment (or `.env`) enables delivery.
fn env_send_email() -> bool {
    std::env::var("SEND_EMAIL")
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

fn print_summary(output: &Path, report: &AnnotateReport, mailed: bool, elapsed: Duration) {
    println!();
    println!("  Digest ready!");
    println!("  File:      {}", output.display());
    println!(
        "  Articles:  {} annotated, {} skipped (of {})",
        report.annotated, report.skipped, report.documents
    );
    if !report.errors.is_empty() {
        println!("  Failures:  {}", report.errors.len());
        for (path, message) in &report.errors {
            println!("    {} — {message}", path.display());
        }
    }
    println!("  Mailed:    {}", if mailed { "yes" } else { "no" });
    println!("  Time:      {:.1}s", elapsed.as_secs_f64());
    println!();
}
