//! The mounter facade.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use stratus_common::{Error, RemoteName, Result};
use stratus_config::{ConfigStore, RemoteDefinition};
use stratus_mount::{AuthorizeOutcome, LetterPool, MountHelper, SessionManager};

use crate::status::{MountStatus, RemoteInfo, StatusEvent};

/// Fixed number of worker tasks draining the command queue.
const WORKER_COUNT: usize = 4;

/// Depth of the bounded command queue.
const COMMAND_QUEUE_DEPTH: usize = 32;

/// Work items handed to the worker tasks.
enum Command {
    Mount { remote: RemoteName, provider: String },
    MountAll,
    Unmount { remote: RemoteName },
    UnmountAll,
    Configure { remote: RemoteName, provider: String },
}

/// The single API surface presentation layers call.
///
/// Every operation that can block (authorization, process spawns) runs on
/// one of a fixed set of worker tasks; completions come back as
/// [`StatusEvent`]s on the single-consumer channel returned by
/// [`Mounter::new`], which the UI loop drains. The facade itself only
/// sequences calls into the store and the session manager.
pub struct Mounter {
    inner: Arc<Inner>,
    commands: mpsc::Sender<Command>,
}

struct Inner {
    manager: SessionManager,
    store: Arc<ConfigStore>,
    helper: Arc<dyn MountHelper>,
    events: mpsc::UnboundedSender<StatusEvent>,
}

impl Mounter {
    /// Create a facade over the default letter pool.
    ///
    /// Returns the facade and the status channel's receiving end. Must be
    /// called within a tokio runtime; the worker tasks stop when the
    /// facade is dropped.
    pub fn new(
        store: Arc<ConfigStore>,
        helper: Arc<dyn MountHelper>,
    ) -> (Self, mpsc::UnboundedReceiver<StatusEvent>) {
        Self::with_pool(store, helper, LetterPool::new())
    }

    /// Create a facade with a custom letter pool.
    pub fn with_pool(
        store: Arc<ConfigStore>,
        helper: Arc<dyn MountHelper>,
        pool: LetterPool,
    ) -> (Self, mpsc::UnboundedReceiver<StatusEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let manager = SessionManager::with_pool(store.clone(), helper.clone(), pool);
        let inner = Arc::new(Inner {
            manager,
            store,
            helper,
            events,
        });

        let (commands, commands_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let commands_rx = Arc::new(Mutex::new(commands_rx));
        for worker in 0..WORKER_COUNT {
            let inner = inner.clone();
            let commands_rx = commands_rx.clone();
            tokio::spawn(async move {
                loop {
                    let command = { commands_rx.lock().await.recv().await };
                    let Some(command) = command else {
                        break;
                    };
                    inner.handle(command).await;
                }
                debug!(worker, "Facade worker stopped");
            });
        }

        (Self { inner, commands }, events_rx)
    }

    /// Define (or replace) a remote from typed-in fields.
    pub async fn add_remote(
        &self,
        name: RemoteName,
        provider: impl Into<String>,
        fields: Vec<(String, String)>,
    ) {
        let provider = provider.into();
        info!(remote = %name, provider, "Adding remote");
        self.inner
            .store
            .upsert(RemoteDefinition::new(name, provider, fields))
            .await;
    }

    /// Remove a remote, unmounting it first if it is live.
    ///
    /// # Errors
    /// - `Error::NotFound` when no such remote is defined
    pub async fn remove_remote(&self, name: &RemoteName) -> Result<()> {
        if self.inner.manager.letter_of(name).await.is_some() {
            self.inner.manager.unmount(name).await?;
            self.inner.emit(name.clone(), MountStatus::Unmounted);
        }
        if self.inner.store.remove(name).await {
            info!(remote = %name, "Remote removed");
            Ok(())
        } else {
            Err(Error::NotFound(format!("Remote '{}' is not defined", name)))
        }
    }

    /// Queue a mount. Completion arrives as a [`StatusEvent`].
    pub async fn mount(&self, remote: RemoteName, provider: impl Into<String>) -> Result<()> {
        self.enqueue(Command::Mount {
            remote,
            provider: provider.into(),
        })
        .await
    }

    /// Queue a mount of every defined remote.
    pub async fn mount_all(&self) -> Result<()> {
        self.enqueue(Command::MountAll).await
    }

    /// Queue an unmount. Unmounting an idle remote is a no-op.
    pub async fn unmount(&self, remote: RemoteName) -> Result<()> {
        self.enqueue(Command::Unmount { remote }).await
    }

    /// Queue an unmount of every live session.
    pub async fn unmount_all(&self) -> Result<()> {
        self.enqueue(Command::UnmountAll).await
    }

    /// Queue an interactive authorization run for a remote.
    pub async fn configure(&self, remote: RemoteName, provider: impl Into<String>) -> Result<()> {
        self.enqueue(Command::Configure {
            remote,
            provider: provider.into(),
        })
        .await
    }

    /// All defined remotes with their mount state.
    pub async fn remotes(&self) -> Vec<RemoteInfo> {
        let mounted: HashMap<RemoteName, String> = self
            .inner
            .manager
            .sessions()
            .await
            .into_iter()
            .map(|(name, letter)| (name, letter.to_string()))
            .collect();

        let mut infos = Vec::new();
        for name in self.inner.store.names().await {
            let Some(def) = self.inner.store.get(&name).await else {
                continue;
            };
            infos.push(RemoteInfo {
                name: name.as_str().to_string(),
                provider: def.provider().to_string(),
                is_mounted: mounted.contains_key(&name),
                mount_point: mounted.get(&name).cloned(),
            });
        }
        infos
    }

    /// Number of live sessions.
    pub async fn mounted_count(&self) -> usize {
        self.inner.manager.session_count().await
    }

    /// Whether the external helper binary can be found.
    pub fn helper_available(&self) -> bool {
        self.inner.helper.is_available()
    }

    /// The helper's name, for status text.
    pub fn helper_name(&self) -> &str {
        self.inner.helper.name()
    }

    /// Tear everything down: unmount every session, then wipe the store.
    ///
    /// Runs directly (not through the queue) so exit paths cannot race a
    /// backlog; guaranteed to leave zero sessions and zero secret material.
    pub async fn shutdown(&self) {
        info!("Shutting down: unmounting all sessions, wiping configuration");
        let live = self.inner.manager.sessions().await;
        self.inner.manager.unmount_all().await;
        for (remote, _) in live {
            self.inner.emit(remote, MountStatus::Unmounted);
        }
        self.inner.store.wipe().await;
    }

    async fn enqueue(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::Config("Facade command queue is closed".to_string()))
    }
}

impl Inner {
    async fn handle(&self, command: Command) {
        match command {
            Command::Mount { remote, provider } => {
                self.do_mount(&remote, &provider).await;
            }
            Command::MountAll => {
                for name in self.store.names().await {
                    let Some(def) = self.store.get(&name).await else {
                        continue;
                    };
                    let provider = def.provider().to_string();
                    drop(def);
                    self.do_mount(&name, &provider).await;
                }
            }
            Command::Unmount { remote } => {
                if let Err(e) = self.manager.unmount(&remote).await {
                    warn!(remote = %remote, error = %e, "Unmount reported an error");
                }
                self.emit(remote, MountStatus::Unmounted);
            }
            Command::UnmountAll => {
                let live = self.manager.sessions().await;
                self.manager.unmount_all().await;
                for (remote, _) in live {
                    self.emit(remote, MountStatus::Unmounted);
                }
            }
            Command::Configure { remote, provider } => {
                match self.helper.authorize(&remote, &provider).await {
                    Ok(AuthorizeOutcome::Captured(text)) => {
                        if let Err(e) = self.store.import(&text).await {
                            warn!(remote = %remote, error = %e, "Captured profile did not parse");
                        }
                    }
                    Ok(AuthorizeOutcome::Cancelled) => {
                        debug!(remote = %remote, "Authorization cancelled");
                    }
                    Err(e) => {
                        warn!(remote = %remote, error = %e, "Authorization flow failed to start");
                    }
                }
            }
        }
    }

    async fn do_mount(&self, remote: &RemoteName, provider: &str) {
        let result = self.manager.mount(remote, provider).await;
        match &result {
            Ok(_) => {}
            Err(Error::AuthorizationCancelled) => {
                debug!(remote = %remote, "Mount not performed: authorization cancelled");
            }
            Err(e) => warn!(remote = %remote, error = %e, "Mount failed"),
        }
        self.emit(remote.clone(), MountStatus::from_mount_result(&result));
    }

    fn emit(&self, remote: RemoteName, status: MountStatus) {
        // The UI may already have dropped its receiver during shutdown.
        let _ = self.events.send(StatusEvent { remote, status });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use stratus_mount::FakeHelper;
    use tokio::time::timeout;

    fn name(s: &str) -> RemoteName {
        RemoteName::new(s).unwrap()
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<StatusEvent>) -> StatusEvent {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for status event")
            .expect("status channel closed")
    }

    async fn setup() -> (
        Mounter,
        mpsc::UnboundedReceiver<StatusEvent>,
        Arc<FakeHelper>,
        Arc<ConfigStore>,
    ) {
        let store = Arc::new(ConfigStore::new());
        let helper = Arc::new(FakeHelper::new());
        let (mounter, rx) = Mounter::new(store.clone(), helper.clone());
        (mounter, rx, helper, store)
    }

    #[tokio::test]
    async fn test_mount_posts_mounted_event() {
        let (mounter, mut rx, _helper, _store) = setup().await;
        mounter
            .add_remote(name("drive1"), "drive", vec![("token".to_string(), "t".to_string())])
            .await;

        mounter.mount(name("drive1"), "drive").await.unwrap();

        let event = next_event(&mut rx).await;
        assert_eq!(event.remote.as_str(), "drive1");
        assert!(matches!(event.status, MountStatus::Mounted { .. }));
        assert_eq!(mounter.mounted_count().await, 1);
    }

    #[tokio::test]
    async fn test_spawn_failure_posts_mount_failed_and_reverts() {
        let (mounter, mut rx, helper, _store) = setup().await;
        helper.fail_spawns();
        mounter.add_remote(name("drive1"), "drive", vec![]).await;

        mounter.mount(name("drive1"), "drive").await.unwrap();

        let event = next_event(&mut rx).await;
        assert!(matches!(event.status, MountStatus::MountFailed { .. }));
        assert_eq!(mounter.mounted_count().await, 0);

        let infos = mounter.remotes().await;
        assert!(!infos[0].is_mounted);
    }

    #[tokio::test]
    async fn test_pool_exhaustion_posts_its_own_status() {
        let store = Arc::new(ConfigStore::new());
        let helper = Arc::new(FakeHelper::new());
        let reserved: Vec<char> = ('A'..='Y').collect();
        let (mounter, mut rx) = Mounter::with_pool(
            store,
            helper,
            LetterPool::with_reserved(&reserved),
        );
        mounter.add_remote(name("a"), "s3", vec![]).await;
        mounter.add_remote(name("b"), "s3", vec![]).await;

        mounter.mount(name("a"), "s3").await.unwrap();
        assert!(matches!(
            next_event(&mut rx).await.status,
            MountStatus::Mounted { .. }
        ));

        mounter.mount(name("b"), "s3").await.unwrap();
        assert!(matches!(
            next_event(&mut rx).await.status,
            MountStatus::PoolExhausted
        ));
    }

    #[tokio::test]
    async fn test_unmount_idle_remote_is_quiet_noop() {
        let (mounter, mut rx, _helper, _store) = setup().await;

        mounter.unmount(name("ghost")).await.unwrap();
        let event = next_event(&mut rx).await;
        assert_eq!(event.remote.as_str(), "ghost");
        assert!(matches!(event.status, MountStatus::Unmounted));
    }

    #[tokio::test]
    async fn test_cancelled_authorization_reverts_without_error() {
        let (mounter, mut rx, _helper, _store) = setup().await;

        // Undefined OAuth remote; the fake reports a cancelled flow.
        mounter.mount(name("gdrive"), "drive").await.unwrap();

        let event = next_event(&mut rx).await;
        assert!(matches!(event.status, MountStatus::Unmounted));
        assert_eq!(mounter.mounted_count().await, 0);
    }

    #[tokio::test]
    async fn test_mount_all_mounts_every_defined_remote() {
        let (mounter, mut rx, _helper, _store) = setup().await;
        mounter.add_remote(name("a"), "s3", vec![]).await;
        mounter.add_remote(name("b"), "webdav", vec![]).await;

        mounter.mount_all().await.unwrap();

        let mut mounted = std::collections::HashSet::new();
        for _ in 0..2 {
            let event = next_event(&mut rx).await;
            assert!(matches!(event.status, MountStatus::Mounted { .. }));
            mounted.insert(event.remote.as_str().to_string());
        }
        assert_eq!(mounted.len(), 2);
        assert_eq!(mounter.mounted_count().await, 2);
    }

    #[tokio::test]
    async fn test_configure_imports_captured_profile() {
        let (mounter, _rx, helper, store) = setup().await;
        helper
            .set_authorize_profile("[gdrive]\ntype = drive\ntoken = fresh\n")
            .await;

        mounter.configure(name("gdrive"), "drive").await.unwrap();

        // Configure posts no event; wait for the import to land.
        timeout(Duration::from_secs(5), async {
            while !store.contains(&name("gdrive")).await {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_remove_remote_unmounts_first() {
        let (mounter, mut rx, helper, store) = setup().await;
        mounter.add_remote(name("a"), "s3", vec![]).await;

        mounter.mount(name("a"), "s3").await.unwrap();
        next_event(&mut rx).await;

        mounter.remove_remote(&name("a")).await.unwrap();
        assert_eq!(mounter.mounted_count().await, 0);
        assert_eq!(helper.live_processes().await, 0);
        assert!(!store.contains(&name("a")).await);

        assert!(matches!(
            mounter.remove_remote(&name("a")).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_shutdown_leaves_nothing_behind() {
        let (mounter, mut rx, helper, store) = setup().await;
        mounter.add_remote(name("a"), "s3", vec![("key".to_string(), "k".to_string())]).await;
        mounter.add_remote(name("b"), "ftp", vec![]).await;

        mounter.mount(name("a"), "s3").await.unwrap();
        next_event(&mut rx).await;
        mounter.mount(name("b"), "ftp").await.unwrap();
        next_event(&mut rx).await;

        mounter.shutdown().await;

        assert_eq!(mounter.mounted_count().await, 0);
        assert_eq!(helper.live_processes().await, 0);
        assert!(store.is_empty().await);
        assert!(store.serialize().await.is_empty());
    }

    #[tokio::test]
    async fn test_remotes_listing_reflects_mount_state() {
        let (mounter, mut rx, _helper, _store) = setup().await;
        mounter.add_remote(name("a"), "s3", vec![]).await;
        mounter.add_remote(name("b"), "ftp", vec![]).await;

        mounter.mount(name("a"), "s3").await.unwrap();
        next_event(&mut rx).await;

        let infos = mounter.remotes().await;
        assert_eq!(infos.len(), 2);
        let a = infos.iter().find(|i| i.name == "a").unwrap();
        assert!(a.is_mounted);
        assert_eq!(a.mount_point.as_deref(), Some("Z:"));
        let b = infos.iter().find(|i| i.name == "b").unwrap();
        assert!(!b.is_mounted);
    }
}
