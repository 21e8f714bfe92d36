use std::path::PathBuf;

use adaptive_connector::config::{Config, FailurePolicy};
use adaptive_connector::io::notify::{Notification, Notifier, TracingNotifier};
use adaptive_connector::io::transport::{AdaptiveClient, HttpTransport};
use adaptive_connector::io::warehouse::CsvWarehouse;
use adaptive_connector::sync::{self, Flow};
use adaptive_connector::{ConnectorError, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging() {
        eprintln!("error: {error}");
    }

    let mut notifier = TracingNotifier;
    match run(cli, &mut notifier) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(error) => {
            let description = sync::describe_error(&error);
            eprintln!("error: {description}");
            if let Err(notify_error) =
                notifier.notify(&Notification::job_status(false, &description))
            {
                eprintln!("error: {notify_error}");
            }
            std::process::exit(1);
        }
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| ConnectorError::Logging(err.to_string()))
}

/// Runs the selected flows; returns whether every flow succeeded.
fn run(cli: Cli, notifier: &mut TracingNotifier) -> Result<bool> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    let policy = cli
        .policy
        .map(FailurePolicy::from)
        .unwrap_or(config.failure_policy);

    let mut warehouse = CsvWarehouse::open(&cli.warehouse_dir)?;
    let client = AdaptiveClient::new(HttpTransport::new(), &config);
    let report = sync::run_and_notify(
        &client,
        &mut warehouse,
        notifier,
        cli.command.flows(),
        policy,
    )?;

    if let Some(path) = &cli.report {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
    }
    Ok(report.success())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Export Adaptive planning data and load it into warehouse tables."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding the warehouse tables as CSV files.
    #[arg(long, default_value = "warehouse")]
    warehouse_dir: PathBuf,

    /// Whether a failed flow stops the remaining ones. Overrides FAILURE_POLICY.
    #[arg(long, value_enum)]
    policy: Option<PolicyKind>,

    /// Optional path receiving the run report as JSON.
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Sync account values and personnel records.
    Run,
    /// Sync account values only.
    Accounts,
    /// Sync personnel records only.
    Personnel,
}

impl Command {
    fn flows(&self) -> &'static [Flow] {
        match self {
            Command::Run => &Flow::ALL,
            Command::Accounts => &[Flow::Accounts],
            Command::Personnel => &[Flow::Personnel],
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum PolicyKind {
    Abort,
    Continue,
}

impl From<PolicyKind> for FailurePolicy {
    fn from(kind: PolicyKind) -> Self {
        match kind {
            PolicyKind::Abort => FailurePolicy::Abort,
            PolicyKind::Continue => FailurePolicy::Continue,
        }
    }
}
