//! In-process mount helper for testing.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use zeroize::Zeroizing;

use stratus_common::{DriveLetter, Error, RemoteName, Result, SecretBytes};

use crate::helper::{AuthorizeOutcome, HelperProcess, MountHelper};

/// Record of one spawn request, kept for assertions.
#[derive(Debug, Clone)]
pub struct SpawnRecord {
    pub remote: RemoteName,
    pub target: DriveLetter,
    pub profile: String,
}

/// Mount helper double that spawns no real processes.
///
/// Useful for testing and development: every "process" is a flag that
/// terminate flips, spawn requests are recorded, and failure modes are
/// switchable per test.
pub struct FakeHelper {
    fail_spawn: AtomicBool,
    spawn_delay: Mutex<Option<Duration>>,
    authorize_profile: Mutex<Option<String>>,
    records: Mutex<Vec<SpawnRecord>>,
    processes: Mutex<Vec<Arc<AtomicBool>>>,
    spawn_count: AtomicUsize,
    next_pid: AtomicU32,
}

impl FakeHelper {
    /// Create a helper double that succeeds at everything.
    pub fn new() -> Self {
        Self {
            fail_spawn: AtomicBool::new(false),
            spawn_delay: Mutex::new(None),
            authorize_profile: Mutex::new(None),
            records: Mutex::new(Vec::new()),
            processes: Mutex::new(Vec::new()),
            spawn_count: AtomicUsize::new(0),
            next_pid: AtomicU32::new(1000),
        }
    }

    /// Make every subsequent spawn fail like a missing binary.
    pub fn fail_spawns(&self) {
        self.fail_spawn.store(true, Ordering::SeqCst);
    }

    /// Delay every subsequent spawn, to widen race windows in tests.
    pub async fn delay_spawns(&self, delay: Duration) {
        *self.spawn_delay.lock().await = Some(delay);
    }

    /// Set the profile text the next authorization run "captures".
    /// Without one, authorization reports a cancelled flow.
    pub async fn set_authorize_profile(&self, profile: impl Into<String>) {
        *self.authorize_profile.lock().await = Some(profile.into());
    }

    /// All spawn requests seen so far.
    pub async fn records(&self) -> Vec<SpawnRecord> {
        self.records.lock().await.clone()
    }

    /// Number of spawn requests that succeeded.
    pub fn spawn_count(&self) -> usize {
        self.spawn_count.load(Ordering::SeqCst)
    }

    /// Number of fake processes still running.
    pub async fn live_processes(&self) -> usize {
        self.processes
            .lock()
            .await
            .iter()
            .filter(|alive| alive.load(Ordering::SeqCst))
            .count()
    }
}

impl Default for FakeHelper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MountHelper for FakeHelper {
    fn name(&self) -> &str {
        "fake"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn spawn_mount(
        &self,
        remote: &RemoteName,
        target: DriveLetter,
        profile: SecretBytes,
    ) -> Result<Box<dyn HelperProcess>> {
        if let Some(delay) = *self.spawn_delay.lock().await {
            tokio::time::sleep(delay).await;
        }

        if self.fail_spawn.load(Ordering::SeqCst) {
            return Err(Error::Spawn("fake: helper binary missing".to_string()));
        }

        self.records.lock().await.push(SpawnRecord {
            remote: remote.clone(),
            target,
            profile: String::from_utf8_lossy(profile.as_bytes()).into_owned(),
        });
        self.spawn_count.fetch_add(1, Ordering::SeqCst);

        let alive = Arc::new(AtomicBool::new(true));
        self.processes.lock().await.push(alive.clone());

        Ok(Box::new(FakeProcess {
            pid: self.next_pid.fetch_add(1, Ordering::SeqCst),
            alive,
        }))
    }

    async fn authorize(&self, remote: &RemoteName, _provider: &str) -> Result<AuthorizeOutcome> {
        let _ = remote;
        match self.authorize_profile.lock().await.clone() {
            Some(profile) => Ok(AuthorizeOutcome::Captured(Zeroizing::new(profile))),
            None => Ok(AuthorizeOutcome::Cancelled),
        }
    }
}

/// A fake helper process: liveness is a flag.
pub struct FakeProcess {
    pid: u32,
    alive: Arc<AtomicBool>,
}

#[async_trait]
impl HelperProcess for FakeProcess {
    async fn id(&self) -> Option<u32> {
        self.alive
            .load(Ordering::SeqCst)
            .then_some(self.pid)
    }

    async fn is_running(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn terminate(&self) -> Result<()> {
        self.alive.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_spawn_records_and_terminates() {
        let helper = FakeHelper::new();
        let remote = RemoteName::new("r").unwrap();
        let target = DriveLetter::new('Z').unwrap();

        let process = helper
            .spawn_mount(&remote, target, SecretBytes::new(b"[r]\ntype = s3\n".to_vec()))
            .await
            .unwrap();

        assert_eq!(helper.spawn_count(), 1);
        assert_eq!(helper.live_processes().await, 1);
        assert!(process.id().await.is_some());
        let records = helper.records().await;
        assert_eq!(records[0].remote.as_str(), "r");
        assert!(records[0].profile.contains("[r]"));

        process.terminate().await.unwrap();
        assert!(!process.is_running().await);
        assert!(process.id().await.is_none());
        assert_eq!(helper.live_processes().await, 0);
    }

    #[tokio::test]
    async fn test_fake_spawn_failure() {
        let helper = FakeHelper::new();
        helper.fail_spawns();

        let remote = RemoteName::new("r").unwrap();
        let target = DriveLetter::new('Z').unwrap();
        let result = helper
            .spawn_mount(&remote, target, SecretBytes::new(Vec::new()))
            .await;
        assert!(matches!(result, Err(Error::Spawn(_))));
        assert_eq!(helper.spawn_count(), 0);
    }

    #[tokio::test]
    async fn test_fake_authorize_defaults_to_cancelled() {
        let helper = FakeHelper::new();
        let remote = RemoteName::new("r").unwrap();
        assert!(matches!(
            helper.authorize(&remote, "drive").await.unwrap(),
            AuthorizeOutcome::Cancelled
        ));

        helper.set_authorize_profile("[r]\ntype = drive\n").await;
        assert!(matches!(
            helper.authorize(&remote, "drive").await.unwrap(),
            AuthorizeOutcome::Captured(_)
        ));
    }
}
