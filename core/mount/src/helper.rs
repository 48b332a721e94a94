//! The external mount helper seam.
//!
//! The helper (rclone) is the actual filesystem implementation; this module
//! only launches it, feeds it a profile over stdin, and terminates it. The
//! [`MountHelper`] trait keeps the session manager testable with the
//! in-process [`crate::FakeHelper`] double.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use stratus_common::{DriveLetter, Error, RemoteName, Result, SecretBytes};

use crate::terminate::{platform_terminator, Terminate};

/// Default helper binary name.
pub const DEFAULT_HELPER: &str = "rclone";

/// Cache and poll tuning passed to every mount, so the mounted path behaves
/// like a normal writable local folder without hammering the remote.
const VFS_CACHE_MODE: &str = "full";
const DIR_CACHE_TIME: &str = "5m";
const POLL_INTERVAL: &str = "30s";

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;
#[cfg(windows)]
const CREATE_NEW_CONSOLE: u32 = 0x0000_0010;

/// Outcome of the interactive authorization flow.
pub enum AuthorizeOutcome {
    /// Profile text read back once from the file the external tool wrote.
    Captured(Zeroizing<String>),
    /// The user aborted the flow; no configuration was produced.
    Cancelled,
}

/// Handle to a live helper child process.
#[async_trait]
pub trait HelperProcess: Send + Sync {
    /// OS process id, if the child has not been reaped.
    async fn id(&self) -> Option<u32>;

    /// Whether the child is still running.
    async fn is_running(&self) -> bool;

    /// Forcefully terminate the child.
    async fn terminate(&self) -> Result<()>;
}

/// The mount helper the session manager drives.
#[async_trait]
pub trait MountHelper: Send + Sync {
    /// Helper name, for logs and status text.
    fn name(&self) -> &str;

    /// Whether the helper binary can be found on this system.
    fn is_available(&self) -> bool;

    /// Launch a mount of `remote` at `target`.
    ///
    /// # Postconditions
    /// - The child received the complete `profile` on stdin and the stream
    ///   was closed immediately; no copy of the profile was written anywhere
    ///
    /// # Errors
    /// - `Error::Spawn` when the binary is missing/unexecutable or rejects
    ///   its configuration input
    async fn spawn_mount(
        &self,
        remote: &RemoteName,
        target: DriveLetter,
        profile: SecretBytes,
    ) -> Result<Box<dyn HelperProcess>>;

    /// Run the interactive authorization flow for `remote`.
    ///
    /// Blocks until the external flow finishes; callers run it off the UI
    /// thread. The external tool writes its own on-disk profile as a side
    /// effect; the captured text is that file read back once.
    async fn authorize(&self, remote: &RemoteName, provider: &str) -> Result<AuthorizeOutcome>;
}

/// The real helper: drives the `rclone` binary.
pub struct RcloneHelper {
    binary: PathBuf,
    terminator: Arc<dyn Terminate>,
}

impl RcloneHelper {
    /// Helper resolved from `PATH` under the default binary name.
    pub fn new() -> Self {
        Self::with_binary(DEFAULT_HELPER)
    }

    /// Helper at an explicit binary path or name.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            terminator: platform_terminator(),
        }
    }

    /// Location of the profile file the external tool writes during
    /// authorization. Owned by the external tool; only ever read here.
    pub fn profile_path() -> Option<PathBuf> {
        #[cfg(windows)]
        {
            dirs::config_dir().map(|dir| dir.join("rclone").join("rclone.conf"))
        }

        #[cfg(not(windows))]
        {
            dirs::home_dir().map(|dir| dir.join(".config").join("rclone").join("rclone.conf"))
        }
    }

    fn mount_command(&self, remote: &RemoteName, target: DriveLetter) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("mount")
            .arg(remote.as_source())
            .arg(target.as_target())
            .arg("--config=-")
            .args(["--vfs-cache-mode", VFS_CACHE_MODE])
            .args(["--dir-cache-time", DIR_CACHE_TIME])
            .args(["--poll-interval", POLL_INTERVAL])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);

        cmd
    }
}

impl Default for RcloneHelper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MountHelper for RcloneHelper {
    fn name(&self) -> &str {
        DEFAULT_HELPER
    }

    fn is_available(&self) -> bool {
        binary_exists(&self.binary)
    }

    async fn spawn_mount(
        &self,
        remote: &RemoteName,
        target: DriveLetter,
        profile: SecretBytes,
    ) -> Result<Box<dyn HelperProcess>> {
        let mut child = self
            .mount_command(remote, target)
            .spawn()
            .map_err(|e| Error::Spawn(format!("{}: {}", self.binary.display(), e)))?;

        // The child must receive a complete, finite input: write the whole
        // profile and close the pipe immediately.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Spawn("helper stdin was not piped".to_string()))?;
        if let Err(e) = stdin.write_all(profile.as_bytes()).await {
            let _ = child.start_kill();
            return Err(Error::Spawn(format!(
                "helper rejected configuration input: {}",
                e
            )));
        }
        drop(stdin);

        info!(remote = %remote, target = %target, "Mount helper launched");

        Ok(Box::new(RcloneProcess {
            child: Mutex::new(child),
            terminator: self.terminator.clone(),
        }))
    }

    async fn authorize(&self, remote: &RemoteName, provider: &str) -> Result<AuthorizeOutcome> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("config")
            .arg("create")
            .arg(remote.as_str())
            .arg(provider);

        // The flow is interactive: give it its own console on Windows, run
        // it in the foreground elsewhere.
        #[cfg(windows)]
        cmd.creation_flags(CREATE_NEW_CONSOLE);

        info!(remote = %remote, provider, "Starting interactive authorization");
        let status = cmd
            .status()
            .await
            .map_err(|e| Error::Spawn(format!("{}: {}", self.binary.display(), e)))?;

        if !status.success() {
            debug!(remote = %remote, "Authorization flow exited without success");
            return Ok(AuthorizeOutcome::Cancelled);
        }

        let Some(path) = Self::profile_path() else {
            return Ok(AuthorizeOutcome::Cancelled);
        };
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(AuthorizeOutcome::Captured(Zeroizing::new(text))),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Authorization produced no readable profile");
                Ok(AuthorizeOutcome::Cancelled)
            }
        }
    }
}

/// A running rclone mount child.
struct RcloneProcess {
    child: Mutex<Child>,
    terminator: Arc<dyn Terminate>,
}

#[async_trait]
impl HelperProcess for RcloneProcess {
    async fn id(&self) -> Option<u32> {
        self.child.lock().await.id()
    }

    async fn is_running(&self) -> bool {
        matches!(self.child.lock().await.try_wait(), Ok(None))
    }

    async fn terminate(&self) -> Result<()> {
        let mut child = self.child.lock().await;
        if let Ok(Some(_)) = child.try_wait() {
            return Ok(());
        }
        self.terminator.terminate(&mut child).await
    }
}

/// Probe for the helper binary: explicit paths are checked directly, bare
/// names are searched on `PATH`.
fn binary_exists(binary: &Path) -> bool {
    if binary.components().count() > 1 {
        return binary.is_file();
    }

    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&paths).any(|dir| {
        let candidate = dir.join(binary);
        if candidate.is_file() {
            return true;
        }
        #[cfg(windows)]
        {
            return candidate.with_extension("exe").is_file();
        }
        #[cfg(not(windows))]
        false
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_path_points_at_helper_conf() {
        let path = RcloneHelper::profile_path().unwrap();
        assert!(path.ends_with(Path::new("rclone").join("rclone.conf")));
    }

    #[test]
    fn test_binary_exists_for_missing_name() {
        assert!(!binary_exists(Path::new("definitely-not-a-real-helper-binary")));
    }

    #[cfg(unix)]
    #[test]
    fn test_binary_exists_finds_path_entries() {
        // `sh` is on PATH in any POSIX environment.
        assert!(binary_exists(Path::new("sh")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawn_mount_missing_binary_is_spawn_error() {
        let helper = RcloneHelper::with_binary("definitely-not-a-real-helper-binary");
        let remote = RemoteName::new("r").unwrap();
        let target = DriveLetter::new('Z').unwrap();
        let result = helper
            .spawn_mount(&remote, target, SecretBytes::new(Vec::new()))
            .await;
        assert!(matches!(result, Err(Error::Spawn(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawned_child_receives_finite_stdin() {
        use std::os::unix::fs::PermissionsExt;

        // A stand-in helper that drains stdin and exits on EOF; it would
        // hang forever if the pipe were kept open.
        let dir = tempfile::tempdir().unwrap();
        let shim = dir.path().join("shim-helper");
        std::fs::write(&shim, "#!/bin/sh\ncat > /dev/null\n").unwrap();
        std::fs::set_permissions(&shim, std::fs::Permissions::from_mode(0o755)).unwrap();

        let helper = RcloneHelper::with_binary(&shim);
        let remote = RemoteName::new("r").unwrap();
        let target = DriveLetter::new('Z').unwrap();
        let process = helper
            .spawn_mount(&remote, target, SecretBytes::new(b"[r]\ntype = s3\n".to_vec()))
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        assert!(!process.is_running().await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_terminate_stops_a_lingering_child() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let shim = dir.path().join("shim-helper");
        std::fs::write(&shim, "#!/bin/sh\ncat > /dev/null\nsleep 30\n").unwrap();
        std::fs::set_permissions(&shim, std::fs::Permissions::from_mode(0o755)).unwrap();

        let helper = RcloneHelper::with_binary(&shim);
        let remote = RemoteName::new("r").unwrap();
        let target = DriveLetter::new('Z').unwrap();
        let process = helper
            .spawn_mount(&remote, target, SecretBytes::new(Vec::new()))
            .await
            .unwrap();

        assert!(process.is_running().await);
        process.terminate().await.unwrap();
        assert!(!process.is_running().await);
    }
}
