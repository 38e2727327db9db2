//! OS termination signals.
//!
//! Handlers are registered when `ShutdownSignals::install` runs, not when
//! `recv` is first polled, so a signal that lands before anyone waits is
//! queued instead of killing the process.

use anyhow::{Context, Result};
use tracing::info;

#[cfg(unix)]
pub struct ShutdownSignals {
    sigint: tokio::signal::unix::Signal,
    sigterm: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    pub fn install() -> Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            sigint: signal(SignalKind::interrupt()).context("installing SIGINT handler")?,
            sigterm: signal(SignalKind::terminate()).context("installing SIGTERM handler")?,
        })
    }

    /// Waits for the next SIGINT or SIGTERM and returns its name.
    pub async fn recv(&mut self) -> &'static str {
        let name = tokio::select! {
            _ = self.sigint.recv() => "SIGINT",
            _ = self.sigterm.recv() => "SIGTERM",
        };
        info!(signal = name, "received shutdown signal");
        name
    }
}

#[cfg(not(unix))]
pub struct ShutdownSignals {
    ctrl_c: tokio::signal::windows::CtrlC,
}

#[cfg(not(unix))]
impl ShutdownSignals {
    pub fn install() -> Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c().context("installing Ctrl+C handler")?,
        })
    }

    pub async fn recv(&mut self) -> &'static str {
        self.ctrl_c.recv().await;
        info!(signal = "Ctrl+C", "received shutdown signal");
        "Ctrl+C"
    }
}
