//! The mount session manager.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use stratus_common::{DriveLetter, Error, RemoteName, Result};
use stratus_config::{providers, ConfigStore};

use crate::helper::{AuthorizeOutcome, HelperProcess, MountHelper};
use crate::letters::LetterPool;

/// The live binding of one remote to one helper process and one mount point.
pub struct MountSession {
    letter: DriveLetter,
    process: Box<dyn HelperProcess>,
}

impl MountSession {
    /// The session's mount-point identifier.
    pub fn letter(&self) -> DriveLetter {
        self.letter
    }
}

/// Owns every live mount session.
///
/// For each remote there is at most one active child process; mount and
/// unmount for the same name are serialized by a per-name lock, while
/// different names proceed concurrently. The configuration store is
/// injected, never ambient.
pub struct SessionManager {
    store: Arc<ConfigStore>,
    helper: Arc<dyn MountHelper>,
    letters: Mutex<LetterPool>,
    sessions: Mutex<HashMap<RemoteName, MountSession>>,
    gates: Mutex<HashMap<RemoteName, Arc<Mutex<()>>>>,
}

impl SessionManager {
    /// Create a manager over the default letter pool.
    pub fn new(store: Arc<ConfigStore>, helper: Arc<dyn MountHelper>) -> Self {
        Self::with_pool(store, helper, LetterPool::new())
    }

    /// Create a manager with a custom letter pool.
    pub fn with_pool(
        store: Arc<ConfigStore>,
        helper: Arc<dyn MountHelper>,
        pool: LetterPool,
    ) -> Self {
        Self {
            store,
            helper,
            letters: Mutex::new(pool),
            sessions: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// The injected configuration store.
    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// Mount a remote.
    ///
    /// If the remote is undefined and its provider needs interactive
    /// sign-in, the authorization flow runs first and its captured blocks
    /// are imported into the store. The profile piped to the helper is a
    /// snapshot taken at launch; later store mutations do not affect the
    /// running session.
    ///
    /// Mounting an already-mounted remote is idempotent: it settles on the
    /// existing session and returns its identifier without spawning a
    /// second process.
    ///
    /// # Errors
    /// - `Error::AuthorizationCancelled` when the user aborts sign-in
    /// - `Error::NotFound` when the remote is undefined and its provider
    ///   is configured from fields rather than interactive sign-in
    /// - `Error::PoolExhausted` when no mount points are left
    /// - `Error::Spawn` when the helper cannot be launched
    pub async fn mount(&self, name: &RemoteName, provider: &str) -> Result<DriveLetter> {
        let gate = self.gate(name).await;
        let _serialized = gate.lock().await;

        if let Some(letter) = self.letter_of(name).await {
            debug!(remote = %name, letter = %letter, "Mount requested for live session");
            return Ok(letter);
        }

        if !self.store.contains(name).await {
            self.authorize_into_store(name, provider).await?;
        }

        let letter = self.letters.lock().await.allocate()?;
        let profile = self.store.serialize().await;
        let process = self.helper.spawn_mount(name, letter, profile).await?;

        info!(remote = %name, letter = %letter, "Mounted");
        self.sessions
            .lock()
            .await
            .insert(name.clone(), MountSession { letter, process });
        Ok(letter)
    }

    /// Unmount a remote.
    ///
    /// Terminates the helper process forcefully if it is still alive and
    /// drops the session record. Unmounting a name with no live session is
    /// a no-op. A failed termination is logged and the session is treated
    /// as gone regardless, so no stale state lingers even if the OS-level
    /// process does.
    pub async fn unmount(&self, name: &RemoteName) -> Result<()> {
        let gate = self.gate(name).await;
        let _serialized = gate.lock().await;

        let Some(session) = self.sessions.lock().await.remove(name) else {
            debug!(remote = %name, "Unmount requested for idle remote");
            return Ok(());
        };

        if session.process.is_running().await {
            if let Err(e) = session.process.terminate().await {
                warn!(remote = %name, error = %e, "Termination failed, dropping session anyway");
            }
        }

        info!(remote = %name, letter = %session.letter, "Unmounted");
        Ok(())
    }

    /// Unmount every tracked session.
    ///
    /// This is the teardown that runs at process exit, before the store is
    /// wiped. Sessions for different remotes are torn down concurrently.
    pub async fn unmount_all(&self) {
        let names: Vec<RemoteName> = self.sessions.lock().await.keys().cloned().collect();
        if names.is_empty() {
            return;
        }

        info!(count = names.len(), "Unmounting all sessions");
        join_all(names.iter().map(|name| self.unmount(name))).await;
    }

    /// The mount point of a live session, if any.
    pub async fn letter_of(&self, name: &RemoteName) -> Option<DriveLetter> {
        self.sessions.lock().await.get(name).map(|s| s.letter())
    }

    /// All live sessions as `(remote, mount point)` pairs.
    pub async fn sessions(&self) -> Vec<(RemoteName, DriveLetter)> {
        self.sessions
            .lock()
            .await
            .iter()
            .map(|(name, session)| (name.clone(), session.letter()))
            .collect()
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    async fn authorize_into_store(&self, name: &RemoteName, provider: &str) -> Result<()> {
        if !providers::requires_authorization(provider) {
            return Err(Error::NotFound(format!(
                "Remote '{}' is not configured",
                name
            )));
        }

        match self.helper.authorize(name, provider).await? {
            AuthorizeOutcome::Captured(text) => {
                self.store.import(&text).await?;
                if self.store.contains(name).await {
                    Ok(())
                } else {
                    // The flow finished but never defined this remote;
                    // treat it the same as an abort.
                    Err(Error::AuthorizationCancelled)
                }
            }
            AuthorizeOutcome::Cancelled => Err(Error::AuthorizationCancelled),
        }
    }

    async fn gate(&self, name: &RemoteName) -> Arc<Mutex<()>> {
        self.gates
            .lock()
            .await
            .entry(name.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
