use std::time::Duration;

use anyhow::{bail, Context as _, Result};
use serenity::async_trait;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Time the child gets to handle SIGINT before it is killed.
const GRACE_PERIOD: Duration = Duration::from_secs(1);

/// A source of updates for the working tree.
#[async_trait]
pub trait Upstream {
    /// Brings the working tree up to date, returning whether anything changed.
    async fn pull(&mut self) -> Result<bool>;
}

/// Something that can be stopped and started again.
#[async_trait]
pub trait Restartable {
    async fn restart(&mut self) -> Result<()>;
}

pub struct GitUpstream;

#[async_trait]
impl Upstream for GitUpstream {
    async fn pull(&mut self) -> Result<bool> {
        let output = Command::new("git")
            .args(["pull", "--ff-only"])
            .output()
            .await
            .context("Failed to run git pull")?;
        if !output.status.success() {
            bail!(
                "git pull --ff-only failed ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!("git pull: {}", stdout.trim());
        Ok(has_changes(&stdout))
    }
}

pub fn has_changes(pull_output: &str) -> bool {
    !pull_output.contains("Already up to date")
}

/// The supervised command, relaunched with the same argv on every restart.
pub struct ChildProcess {
    argv: Vec<String>,
    child: Child,
}

impl ChildProcess {
    pub fn spawn(argv: Vec<String>) -> Result<Self> {
        let child = launch(&argv)?;
        Ok(Self { argv, child })
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    #[cfg(unix)]
    fn interrupt(&mut self) -> Result<()> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = self.child.id() {
            kill(Pid::from_raw(pid as i32), Signal::SIGINT)
                .with_context(|| format!("Failed to interrupt process {pid}"))?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn interrupt(&mut self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl Restartable for ChildProcess {
    async fn restart(&mut self) -> Result<()> {
        self.interrupt()?;
        tokio::time::sleep(GRACE_PERIOD).await;
        if self.child.try_wait()?.is_none() {
            warn!("Child still running after SIGINT, killing it");
            self.child.start_kill().context("Failed to kill child")?;
        }
        let status = self.child.wait().await?;
        debug!("Child exited with {}", status);
        self.child = launch(&self.argv)?;
        Ok(())
    }
}

fn launch(argv: &[String]) -> Result<Child> {
    let (program, args) = argv.split_first().context("No command to run")?;
    Command::new(program)
        .args(args)
        .spawn()
        .with_context(|| format!("Failed to start {}", argv.join(" ")))
}

pub struct Supervisor<U, P> {
    upstream: U,
    process: P,
    interval: Duration,
}

impl<U: Upstream, P: Restartable> Supervisor<U, P> {
    pub fn new(upstream: U, process: P, interval: Duration) -> Self {
        Self {
            upstream,
            process,
            interval,
        }
    }

    /// Pulls once and restarts the process if the pull changed anything.
    pub async fn poll_once(&mut self) -> Result<bool> {
        if !self.upstream.pull().await? {
            return Ok(false);
        }
        info!("Restarting...");
        self.process.restart().await?;
        info!("Restart done...");
        Ok(true)
    }

    pub async fn run(mut self) -> Result<()> {
        loop {
            self.poll_once().await?;
            tokio::time::sleep(self.interval).await;
        }
    }
}
