use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod supervisor;

use supervisor::{ChildProcess, GitUpstream, Supervisor, Upstream};

/// Periodically runs `git pull --ff-only` and restarts the command when it pulls changes.
#[derive(Debug, Parser)]
#[command(name = "autoupdate")]
struct Args {
    /// Seconds between pulls.
    #[arg(short, long, default_value_t = 600)]
    interval: u64,

    /// Command line of the process to supervise.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let args = Args::parse();

    let mut upstream = GitUpstream;
    upstream.pull().await?;
    let process = ChildProcess::spawn(args.command)?;
    info!(
        "Started {:?}, checking for updates every {}s",
        process.id(),
        args.interval
    );

    Supervisor::new(upstream, process, Duration::from_secs(args.interval))
        .run()
        .await
}
