//! fpenroll CLI: drive the enrollment coordinator against mock gateways.

mod sink;

use anyhow::Context;
use clap::{Parser, Subcommand};
use fpenroll_core::{AcquiredInfo, FingerprintId, GroupId, SessionIdentity, UserId};
use fpenroll_daemon::{CoordinatorConfig, EnrollRequest, EnrollmentCoordinator, GatewayContext};
use fpenroll_hardware::ResultSink;
use fpenroll_hardware::mock::{CallLog, MemoryTemplateStore, MockDaemon, MockIndicator};
use sink::ConsoleSink;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const SIMULATED_TOKEN: [u8; 32] = [0x5a; 32];

#[derive(Parser)]
#[command(
    name = "fpenroll",
    about = "Fingerprint enrollment coordinator",
    version,
    propagate_version = true
)]
struct Cli {
    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one enrollment against a simulated sensor driver.
    Simulate(SimulateArgs),
}

#[derive(clap::Args, Debug)]
struct SimulateArgs {
    /// Number of captures the driver asks for.
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..))]
    steps: u32,

    /// Simulate an under-display sensor with an on-screen indicator.
    #[arg(long)]
    udfps: bool,

    /// User the fingerprint is enrolled for.
    #[arg(long, default_value_t = 0)]
    user: i32,

    /// Fingerprint group.
    #[arg(long, default_value_t = 0)]
    group: i32,

    /// Cancel from the client after this many progress steps.
    #[arg(long)]
    cancel_after: Option<u32>,

    /// Make the driver reject the enroll request with this code.
    #[arg(long)]
    reject_code: Option<i32>,

    /// Delay between simulated captures, in milliseconds.
    #[arg(long, default_value_t = 100)]
    step_delay_ms: u64,

    /// Path to a JSON coordinator configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Simulate(args) => simulate(args).await,
    }
}

async fn simulate(args: SimulateArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => CoordinatorConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => CoordinatorConfig::default(),
    };
    if args.udfps {
        config = config.under_display_sensor(true);
    }

    let log = CallLog::new();
    let (daemon, driver) = MockDaemon::new(log.clone());
    if let Some(code) = args.reject_code {
        driver.set_enroll_result(code);
    }

    let context = GatewayContext::new(
        &config,
        daemon,
        Arc::new(MockIndicator::new(log.clone())),
        Arc::new(MemoryTemplateStore::new(log.clone())),
    )
    .context("failed to build gateway context")?;
    let wait_limit = config.session_timeout() + Duration::from_secs(1);

    let mut handle =
        EnrollmentCoordinator::start(config, context).context("failed to start coordinator")?;
    driver.attach(handle.coordinator().callback());

    let identity = SessionIdentity::new(
        UserId::new(args.user),
        GroupId::new(args.group),
        "fpenroll-cli",
    )
    .context("invalid session identity")?;
    let console = Arc::new(ConsoleSink::default());
    let sink: Arc<dyn ResultSink> = console.clone();

    match handle
        .coordinator()
        .enroll(EnrollRequest::new(identity, SIMULATED_TOKEN), &sink)
    {
        Ok(session) => {
            tracing::info!(session = %session.session_id(), steps = args.steps, "driving simulated captures");

            let fingerprint = FingerprintId::new(1);
            let group = GroupId::new(args.group);
            for step in 1..=args.steps {
                if args.cancel_after.is_some_and(|k| step > k) {
                    tracing::info!(after = step - 1, "cancelling from client");
                    handle
                        .coordinator()
                        .cancel(&session)
                        .context("cancel failed")?;
                    break;
                }

                tokio::time::sleep(Duration::from_millis(args.step_delay_ms)).await;
                driver.emit_acquired(AcquiredInfo::Good, 0);
                let remaining = i32::try_from(args.steps - step).context("too many steps")?;
                driver.emit_progress(fingerprint, group, remaining);
            }
        }
        Err(e) => eprintln!("enroll rejected: {e}"),
    }

    let outcome = tokio::time::timeout(wait_limit, handle.recv())
        .await
        .context("timed out waiting for the session outcome")?
        .context("coordinator stopped before reporting an outcome")?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    println!("progress notifications: {}", console.progress_count());
    println!("gateway calls:");
    for call in log.snapshot() {
        println!("  {call:?}");
    }

    let report = handle.shutdown().await?;
    tracing::debug!(?report, "shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_simulate_defaults() {
        let cli = Cli::try_parse_from(["fpenroll", "simulate"]).unwrap();
        let Commands::Simulate(args) = cli.command;

        assert_eq!(args.steps, 5);
        assert!(!args.udfps);
        assert_eq!(args.cancel_after, None);
        assert_eq!(args.reject_code, None);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_simulate_flags() {
        let cli = Cli::try_parse_from([
            "fpenroll",
            "-v",
            "simulate",
            "--steps",
            "3",
            "--udfps",
            "--user",
            "10",
            "--cancel-after",
            "1",
            "--reject-code",
            "7",
        ])
        .unwrap();
        let Commands::Simulate(args) = cli.command;

        assert!(cli.verbose);
        assert_eq!(args.steps, 3);
        assert!(args.udfps);
        assert_eq!(args.user, 10);
        assert_eq!(args.cancel_after, Some(1));
        assert_eq!(args.reject_code, Some(7));
    }

    #[test]
    fn test_zero_steps_rejected() {
        assert!(Cli::try_parse_from(["fpenroll", "simulate", "--steps", "0"]).is_err());
    }
}
