use anyhow::Context;
use clap::Parser;
use stampede::grpc::GrpcTransport;
use stampede::runner::Runner;
use stampede_core::{RunConfig, RunReport};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Exit code when the run completed but thresholds failed.
const EXIT_FAILED: u8 = 1;
/// Exit code for fatal setup errors (bad scenario, unknown operation).
const EXIT_SETUP: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "stampede",
    about = "Staged virtual-user load generator for gRPC services"
)]
struct Args {
    /// Scenario file (TOML).
    scenario: PathBuf,

    /// Override the scenario's rng seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Override the scenario's target endpoint.
    #[arg(long)]
    endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stampede=info")),
        )
        .init();

    match run(Args::parse()).await {
        Ok(report) => {
            print!("{report}");
            if report.passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_FAILED)
            }
        }
        Err(err) => {
            error!("setup failed: {err:#}");
            ExitCode::from(EXIT_SETUP)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<RunReport> {
    let raw = std::fs::read_to_string(&args.scenario)
        .with_context(|| format!("reading {}", args.scenario.display()))?;
    let mut config: RunConfig = toml::from_str(&raw)
        .with_context(|| format!("parsing {}", args.scenario.display()))?;
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if let Some(endpoint) = args.endpoint {
        config.endpoint = endpoint;
    }

    let transport = GrpcTransport::new(&config).context("setting up gRPC transport")?;
    let runner = Runner::new(config, transport)
        .context("validating scenario")?
        .with_shutdown(interrupt_signal());
    Ok(runner.run().await)
}

/// Watch channel that flips on the first ctrl-c; the runner answers by
/// ramping down gracefully.
fn interrupt_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received; ramping down");
        }
        // Dropping the sender also cancels the run, so a signal-handler
        // failure degrades to an abort instead of an unstoppable run.
        let _ = tx.send(true);
    });
    rx
}
