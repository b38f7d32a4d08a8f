//! Install Watch - Tails installer logs and reports how installation ended.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use install_watch::config::{ConfigError, ConfigLoader, InstallConfig};
use install_watch::display;
use install_watch::install::{InstallError, Orchestrator};
use install_watch::watcher::{
    Classifier, LogEncoding, MonitorEvent, PatternError, TailMonitor, WatchTarget,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EncodingArg {
    Utf8,
    Utf16le,
}

impl From<EncodingArg> for LogEncoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Utf8 => LogEncoding::Utf8,
            EncodingArg::Utf16le => LogEncoding::Utf16Le,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PresetArg {
    /// `[ERROR]`, `[FAILURE]` and `[SUCCESS]` markers plus configured rules.
    Generic,
    /// Visual Studio Build Tools bootstrapper log.
    BuildTools,
    /// msiexec verbose log.
    Python,
}

#[derive(Parser)]
#[command(
    name = "install-watch",
    about = "Watches installer log files and reports how the installation ended",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file to use instead of the default search paths.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tail a single log until it reports an outcome.
    Tail {
        /// Log file to watch. It does not need to exist yet.
        path: PathBuf,
        /// Text encoding of the log (defaults to utf16le for the python preset).
        #[arg(short, long, value_enum)]
        encoding: Option<EncodingArg>,
        /// Which recognizers to apply.
        #[arg(short, long, value_enum, default_value_t = PresetArg::Generic)]
        preset: PresetArg,
        /// Poll interval in milliseconds.
        #[arg(long)]
        poll_ms: Option<u64>,
        /// Give up after this many seconds.
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Print the outcome as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Watch the build tools and Python installer logs together.
    Watch {
        /// Poll interval in milliseconds.
        #[arg(long)]
        poll_ms: Option<u64>,
        /// Give up after this many seconds.
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Invalid rule in config: {0}")]
    Pattern(#[from] PatternError),
    #[error(transparent)]
    Install(#[from] InstallError),
    #[error("Failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<InstallConfig, ConfigError> {
    let loader = path.map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    loader.load()
}

/// Cancel `token` on Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, stopping monitors");
            token.cancel();
        }
    });
}

fn exit_code(event: &MonitorEvent) -> ExitCode {
    match event {
        MonitorEvent::Success { .. } => ExitCode::SUCCESS,
        MonitorEvent::Failure { .. } => ExitCode::from(1),
        MonitorEvent::Error { .. } => ExitCode::from(2),
        MonitorEvent::Timeout { .. } => ExitCode::from(3),
    }
}

async fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let mut config = load_config(cli.config)?;
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    match cli.command {
        Commands::Tail {
            path,
            encoding,
            preset,
            poll_ms,
            timeout_secs,
            json,
        } => {
            apply_overrides(&mut config, poll_ms, timeout_secs);
            let (classifier, default_encoding) = match preset {
                PresetArg::Generic => (
                    config.classifier_with_rules(Classifier::generic())?,
                    LogEncoding::Utf8,
                ),
                PresetArg::BuildTools => (Classifier::build_tools(), LogEncoding::Utf8),
                PresetArg::Python => (Classifier::python(), LogEncoding::Utf16Le),
            };
            let encoding = encoding.map_or(default_encoding, LogEncoding::from);
            let target = WatchTarget::new(&path).with_encoding(encoding);

            tracing::info!(
                path = %path.display(),
                encoding = %encoding,
                preset = ?preset,
                poll_interval_ms = config.monitor.poll_interval_ms,
                max_wait_secs = config.monitor.max_wait_secs,
                "Tailing installer log"
            );

            let handle =
                TailMonitor::new(target, classifier, config.monitor.to_options()).spawn_with(cancel);
            let Some(event) = handle.wait().await else {
                return Ok(ExitCode::from(130));
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&event)?);
            } else {
                display::print_event(&path, &event);
            }
            Ok(exit_code(&event))
        }
        Commands::Watch {
            poll_ms,
            timeout_secs,
            json,
        } => {
            apply_overrides(&mut config, poll_ms, timeout_secs);
            let report = Orchestrator::new(config).run(cancel).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            Ok(if report.all_installed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }
    }
}

fn apply_overrides(config: &mut InstallConfig, poll_ms: Option<u64>, timeout_secs: Option<u64>) {
    if let Some(ms) = poll_ms {
        config.monitor.poll_interval_ms = ms;
    }
    if let Some(secs) = timeout_secs {
        config.monitor.max_wait_secs = secs;
    }
    tracing::debug!(
        poll_interval = ?Duration::from_millis(config.monitor.poll_interval_ms),
        max_wait = ?Duration::from_secs(config.monitor.max_wait_secs),
        "Monitor settings"
    );
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "install-watch failed");
            eprintln!("Error: {e}");
            ExitCode::from(2)
        }
    }
}
