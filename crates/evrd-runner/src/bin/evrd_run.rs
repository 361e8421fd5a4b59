use std::path::PathBuf;

use clap::Parser;
use evrd_runner::{AdcTokenProvider, ControlPlaneClient, RunDriver, TokenProvider};
use tracing_subscriber::EnvFilter;

/// Drives a single reconciliation run to completion. Intended to be invoked
/// by an external trigger mechanism (a job platform) with a run id already
/// recorded as `pending`/`triggered` in the control plane.
#[derive(Debug, Parser)]
#[command(name = "evrd-run", about = "Execute one reconciliation run", version)]
struct Args {
    /// The run id to fetch and drive.
    run_id: String,

    #[arg(long, env = "CONTROL_PLANE_BASE_URL")]
    control_plane_base_url: String,

    /// terraform or tofu.
    #[arg(long, env = "IAC_BINARY", default_value = "terraform")]
    iac_binary: String,

    #[arg(long, env = "IAC_WORK_DIR", default_value = "/tmp/evrd-runs")]
    work_dir: PathBuf,

    /// Substitutes `plan` for `apply` and never mutates external state.
    #[arg(long, env = "DRY_RUN", default_value_t = false)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let args = Args::parse();

    let token_provider: Box<dyn TokenProvider> = match AdcTokenProvider::new(
        "https://www.googleapis.com/auth/cloud-platform",
    )
    .await
    {
        Ok(p) => Box::new(p),
        Err(e) => {
            tracing::warn!(error = %e, "falling back to unauthenticated control-plane client");
            Box::new(evrd_runner::StaticToken(String::new()))
        }
    };

    let control_plane = ControlPlaneClient::new(args.control_plane_base_url, token_provider);
    let driver = RunDriver::new(control_plane, args.iac_binary, args.work_dir, args.dry_run);

    match driver.execute(&args.run_id).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(run_id = %args.run_id, error = %e, "run failed");
            std::process::ExitCode::FAILURE
        }
    }
}
