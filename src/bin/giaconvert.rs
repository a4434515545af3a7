//! CLI binary for giaconvert-client.
//!
//! A thin shim over the library crate: maps flags and persisted settings to
//! `ConversionSettings`, drives one conversion and prints the outcome.

use anyhow::{bail, Context, Result};
use clap::Parser;
use giaconvert_client::{
    ClientConfig, ConversionMode, ConversionSession, FileSelection, HttpConversionService,
    JobOutcome, LifecycleController, LifecyclePhase, LifecycleProgressCallback, OutputOption,
    ProgressCallback, SelectedFile, ServiceHealth, SessionId, SettingsStore,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner while uploading, then a bar over
/// the job's documents fed by status snapshots.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn activate_bar(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} documents  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Converting");
        self.bar.set_message("queued");
    }
}

impl LifecycleProgressCallback for CliProgressCallback {
    fn on_upload_start(&self, file_count: usize) {
        self.bar.set_prefix("Uploading");
        self.bar.set_message(format!("{file_count} documents…"));
    }

    fn on_upload_complete(&self, uploaded: usize, requested: usize) {
        if uploaded < requested {
            self.bar.println(format!(
                "{} Uploaded {}/{} documents; {} rejected by the service",
                yellow("⚠"),
                uploaded,
                requested,
                requested - uploaded
            ));
        } else {
            self.bar.println(format!(
                "{} Uploaded {} documents",
                green("✓"),
                bold(&uploaded.to_string())
            ));
        }
    }

    fn on_submitted(&self, session_id: &SessionId, total_files: usize) {
        self.activate_bar(total_files);
        self.bar.println(format!(
            "{} {} {}",
            cyan("◆"),
            bold("Conversion started"),
            dim(session_id.as_ref())
        ));
    }

    fn on_snapshot(&self, session: &ConversionSession) {
        if session.total_count() as u64 != self.bar.length().unwrap_or(0) {
            self.bar.set_length(session.total_count() as u64);
        }
        self.bar.set_position(session.completed_count() as u64);
        let msg = match session.current_file() {
            Some(f) => format!("{} {f}", session.status()),
            None => session.status().to_string(),
        };
        self.bar.set_message(msg);
    }

    fn on_poll_error(&self, error: &str) {
        self.bar
            .println(format!("  {} {}", yellow("⚠"), dim(error)));
    }

    fn on_finished(&self, _outcome: &JobOutcome) {
        self.bar.finish_and_clear();
    }

    fn on_cancelled(&self) {
        self.bar.abandon_with_message("cancelled");
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert every Word document under a folder, next to the originals
  giaconvert ./reports

  # Mirror the folder tree into another directory, complete mode
  giaconvert ./reports --mode complete --output-option mirrored --destination /srv/html

  # Individual files, machine-readable result
  giaconvert a.docx b.doc --json > result.json

  # Service checks
  giaconvert --health
  giaconvert --list-modes

OUTPUT OPTIONS:
  beside         HTML written next to each source document (default)
  mirrored       Folder structure recreated under --destination
  single-folder  Every HTML file written flat into --destination

Settings (mode, output option, destination) are remembered between runs in
<config dir>/giaconvert/settings.json unless --settings points elsewhere.

ENVIRONMENT VARIABLES:
  GIACONVERT_SERVER         Service base URL (default http://127.0.0.1:8000/api)
  GIACONVERT_MODE           basic | enhanced | complete
  GIACONVERT_OUTPUT_OPTION  beside | mirrored | single-folder
  GIACONVERT_DESTINATION    Destination folder
  RUST_LOG                  Log filter, overrides -v / -q
"#;

/// Convert Word documents to HTML through a GIACONVERT service.
#[derive(Parser, Debug)]
#[command(
    name = "giaconvert",
    version,
    about = "Convert Word documents to HTML through a GIACONVERT service",
    long_about = "Upload .docx/.doc files (or whole folders) to a GIACONVERT conversion \
service, start a conversion job and follow it until it finishes. Lock files (~$*) and \
hidden files are skipped automatically.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Word documents or folders to convert.
    #[arg(required_unless_present_any = ["health", "list_modes"])]
    inputs: Vec<PathBuf>,

    /// Service base URL.
    #[arg(long, env = "GIACONVERT_SERVER", default_value = giaconvert_client::config::DEFAULT_BASE_URL)]
    server: String,

    /// Conversion mode (remembered for next time).
    #[arg(short, long, env = "GIACONVERT_MODE", value_enum)]
    mode: Option<ModeArg>,

    /// Where the HTML files go (remembered for next time).
    #[arg(short, long, env = "GIACONVERT_OUTPUT_OPTION", value_enum)]
    output_option: Option<OutputArg>,

    /// Destination folder for mirrored / single-folder output.
    #[arg(short, long, env = "GIACONVERT_DESTINATION")]
    destination: Option<String>,

    /// Status polling interval in milliseconds.
    #[arg(long, env = "GIACONVERT_POLL_INTERVAL_MS", default_value_t = 1000)]
    poll_interval_ms: u64,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, env = "GIACONVERT_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Settings file to use instead of the platform default.
    #[arg(long, env = "GIACONVERT_SETTINGS")]
    settings: Option<PathBuf>,

    /// Check whether the service is reachable and exit.
    #[arg(long)]
    health: bool,

    /// Print the available conversion modes and exit.
    #[arg(long)]
    list_modes: bool,

    /// Print the final session as JSON instead of a summary.
    #[arg(long, env = "GIACONVERT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "GIACONVERT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "GIACONVERT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "GIACONVERT_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Basic,
    Enhanced,
    Complete,
}

impl From<ModeArg> for ConversionMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Basic => ConversionMode::Basic,
            ModeArg::Enhanced => ConversionMode::Enhanced,
            ModeArg::Complete => ConversionMode::Complete,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OutputArg {
    Beside,
    Mirrored,
    #[value(alias = "single_folder")]
    SingleFolder,
}

impl From<OutputArg> for OutputOption {
    fn from(v: OutputArg) -> Self {
        match v {
            OutputArg::Beside => OutputOption::Beside,
            OutputArg::Mirrored => OutputOption::Mirrored,
            OutputArg::SingleFolder => OutputOption::SingleFolder,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    let service = Arc::new(
        HttpConversionService::new(config.clone()).context("Failed to create HTTP client")?,
    );

    // ── Service queries ──────────────────────────────────────────────────
    if cli.health {
        let health = giaconvert_client::check_health(service.as_ref()).await;
        if cli.json {
            println!("{}", serde_json::to_string(&health)?);
        } else {
            match health {
                ServiceHealth::Online => println!("{} {} is online", green("●"), config.base_url),
                _ => println!("{} {} is offline", red("●"), config.base_url),
            }
        }
        return Ok(if health == ServiceHealth::Online {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    if cli.list_modes {
        let catalog = giaconvert_client::load_modes(service.as_ref()).await;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&catalog)?);
        } else {
            for (key, info) in &catalog.modes {
                println!("{:<10} {}  {}", bold(key), info.name, dim(&info.description));
                for feature in &info.features {
                    println!("           • {feature}");
                }
            }
            if catalog.source == giaconvert_client::CatalogSource::BuiltIn {
                eprintln!("{}", dim("(service unavailable, showing built-in modes)"));
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    // ── Settings ─────────────────────────────────────────────────────────
    let store = SettingsStore::from_config(&config).context("Failed to locate settings file")?;
    let current = store.load();
    let mut next = current.clone();
    if let Some(mode) = cli.mode {
        next.selected_mode = mode.into();
    }
    if let Some(option) = cli.output_option {
        next.output_option = option.into();
    }
    if let Some(ref destination) = cli.destination {
        next.destination_path = destination.clone();
    }
    if let Err(e) = store.update(&current, &next) {
        warn!("Settings were not saved: {}", e);
    }
    let settings = next.to_conversion_settings();

    // ── Selection ────────────────────────────────────────────────────────
    let selection = select_inputs(&cli.inputs)?;
    if !cli.quiet && !cli.json {
        eprintln!(
            "{} {} Word documents selected  {}",
            cyan("◆"),
            bold(&selection.len().to_string()),
            dim(&format!("mode {}, output {}", settings.mode, settings.output_option)),
        );
    }

    if giaconvert_client::check_health(service.as_ref()).await == ServiceHealth::Offline
        && !cli.quiet
    {
        eprintln!(
            "{} {} did not answer the health check; trying anyway",
            yellow("⚠"),
            config.base_url
        );
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let mut controller = LifecycleController::new(service, config);
    if show_progress {
        let cb: ProgressCallback = CliProgressCallback::new();
        controller = controller.with_progress_callback(cb);
    }

    controller
        .start(selection.files(), settings)
        .await
        .context("Conversion could not be started")?;

    let finished = tokio::select! {
        snapshot = controller.wait_for_completion() => snapshot,
        _ = tokio::signal::ctrl_c() => {
            controller.cancel();
            controller.snapshot()
        }
    };

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&finished).context("Failed to serialise result")?
        );
    } else if let Some(ref session) = finished.session {
        if !cli.quiet {
            print_session(session);
        }
    }

    match finished.phase {
        LifecyclePhase::Completed => Ok(ExitCode::SUCCESS),
        LifecyclePhase::CompletedWithErrors => Ok(ExitCode::from(2)),
        LifecyclePhase::Cancelled => {
            eprintln!("{} Conversion cancelled", yellow("✘"));
            Ok(ExitCode::from(130))
        }
        LifecyclePhase::Failed => bail!(finished
            .last_error
            .unwrap_or_else(|| "Conversion failed".to_string())),
        other => bail!("Conversion ended unexpectedly in phase {:?}", other),
    }
}

/// Map CLI args to `ClientConfig`.
fn build_config(cli: &Cli) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder()
        .base_url(cli.server.clone())
        .poll_interval(Duration::from_millis(cli.poll_interval_ms))
        .request_timeout(Duration::from_secs(cli.timeout));
    if let Some(ref path) = cli.settings {
        builder = builder.settings_path(path.clone());
    }
    builder.build().context("Invalid client configuration")
}

/// Folders contribute every document beneath them; files are added as-is
/// and filtered like any other selection.
fn select_inputs(inputs: &[PathBuf]) -> Result<FileSelection> {
    let mut selection = FileSelection::new();
    for input in inputs {
        if input.is_dir() {
            let mut folder = FileSelection::new();
            folder
                .load_folder(input)
                .with_context(|| format!("Failed to read folder {}", input.display()))?;
            selection.add_files(folder.files().to_vec());
        } else {
            let file = SelectedFile::from_path(input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            if selection.add_files([file]) == 0 {
                warn!("Skipping {}: not a Word document", input.display());
            }
        }
    }
    Ok(selection)
}

fn print_session(session: &ConversionSession) {
    for result in session.results() {
        let target = result.output_file.as_deref().unwrap_or("-");
        let images = if result.images_extracted > 0 {
            dim(&format!("  {} images", result.images_extracted))
        } else {
            String::new()
        };
        eprintln!(
            "  {} {}  →  {}{}",
            green("✓"),
            result.source_file,
            target,
            images
        );
    }
    for error in session.errors() {
        eprintln!("  {} {}", red("✗"), error);
    }

    if let Some(outcome) = session.outcome() {
        let mark = match outcome {
            JobOutcome::Completed { .. } => green("✔"),
            JobOutcome::CompletedWithErrors { .. } => yellow("⚠"),
            JobOutcome::Failed { .. } => red("✘"),
        };
        eprintln!("{} {}", mark, outcome.summary());
    }
}
