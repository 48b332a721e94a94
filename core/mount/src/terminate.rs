//! Platform-appropriate forceful process termination.
//!
//! The mount helper may not unwind its kernel-level mount cleanly within a
//! bounded time, so unmounting terminates the child forcefully instead of
//! waiting for graceful shutdown. The platform split lives behind the
//! [`Terminate`] seam, selected once at startup.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Child;
use tracing::debug;

use stratus_common::{Error, Result};

/// How long a signalled child gets before the forceful follow-up.
const TERMINATE_GRACE: Duration = Duration::from_secs(3);

/// Termination capability for helper child processes.
#[async_trait]
pub trait Terminate: Send + Sync {
    /// Terminate the child and reap it.
    ///
    /// # Postconditions
    /// - The child has exited (or the error reports why that is unknown)
    ///
    /// # Errors
    /// - `Error::Termination` when neither path brought the child down
    async fn terminate(&self, child: &mut Child) -> Result<()>;
}

/// Signal-based termination: SIGTERM, then SIGKILL after a grace period.
#[cfg(unix)]
pub struct SignalTerminate;

#[cfg(unix)]
#[async_trait]
impl Terminate for SignalTerminate {
    async fn terminate(&self, child: &mut Child) -> Result<()> {
        let Some(pid) = child.id() else {
            // Already reaped.
            return Ok(());
        };

        let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if rc == 0 {
            if let Ok(status) = tokio::time::timeout(TERMINATE_GRACE, child.wait()).await {
                status.map_err(|e| Error::Termination(e.to_string()))?;
                debug!(pid, "Helper exited on SIGTERM");
                return Ok(());
            }
            debug!(pid, "Helper ignored SIGTERM, escalating");
        }

        child
            .kill()
            .await
            .map_err(|e| Error::Termination(e.to_string()))
    }
}

/// Kill-by-pid termination: `taskkill /F /PID`, as the helper on Windows
/// holds the mount through a driver and does not react to console signals.
#[cfg(windows)]
pub struct KillByPidTerminate;

#[cfg(windows)]
#[async_trait]
impl Terminate for KillByPidTerminate {
    async fn terminate(&self, child: &mut Child) -> Result<()> {
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;

        let Some(pid) = child.id() else {
            return Ok(());
        };

        let mut taskkill = std::process::Command::new("taskkill");
        taskkill.args(["/F", "/PID", &pid.to_string()]);
        taskkill.creation_flags(CREATE_NO_WINDOW);

        let killed = tokio::task::spawn_blocking(move || taskkill.status())
            .await
            .map_err(|e| Error::Termination(e.to_string()))?
            .map(|s| s.success())
            .unwrap_or(false);

        if !killed {
            debug!(pid, "taskkill failed, falling back to direct kill");
            child
                .kill()
                .await
                .map_err(|e| Error::Termination(e.to_string()))?;
            return Ok(());
        }

        child
            .wait()
            .await
            .map_err(|e| Error::Termination(e.to_string()))?;
        debug!(pid, "Helper killed by pid");
        Ok(())
    }
}

/// Last-resort termination for platforms without a dedicated path.
#[cfg(not(any(unix, windows)))]
pub struct DirectKillTerminate;

#[cfg(not(any(unix, windows)))]
#[async_trait]
impl Terminate for DirectKillTerminate {
    async fn terminate(&self, child: &mut Child) -> Result<()> {
        child
            .kill()
            .await
            .map_err(|e| Error::Termination(e.to_string()))
    }
}

/// Pick the termination implementation for the current platform.
pub fn platform_terminator() -> Arc<dyn Terminate> {
    #[cfg(unix)]
    {
        Arc::new(SignalTerminate)
    }

    #[cfg(windows)]
    {
        Arc::new(KillByPidTerminate)
    }

    #[cfg(not(any(unix, windows)))]
    {
        Arc::new(DirectKillTerminate)
    }
}
