//! The in-memory configuration store.

use tokio::sync::RwLock;
use tracing::{debug, info};

use stratus_common::{RemoteName, Result, SecretBytes};

use crate::profile::{parse_profile, render_profile};
use crate::remote::RemoteDefinition;

/// Process-wide store of remote definitions.
///
/// The store lives only in memory for the lifetime of the process: it is
/// never flushed to a file, and its serialized form is handed out as
/// [`SecretBytes`] whose only consumer pipes it into a helper's stdin.
///
/// Upsert replaces any existing block with the same name; a reader never
/// observes a half-written block (the write lock covers the whole
/// filter-then-append step). Reads taken for a mount are snapshots: later
/// mutations do not affect an already-launched session.
pub struct ConfigStore {
    remotes: RwLock<Vec<RemoteDefinition>>,
}

impl ConfigStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            remotes: RwLock::new(Vec::new()),
        }
    }

    /// Insert or replace a remote definition.
    ///
    /// # Postconditions
    /// - Exactly one definition exists for the remote's name
    /// - The replacement is atomic from any reader's perspective
    pub async fn upsert(&self, def: RemoteDefinition) {
        let mut remotes = self.remotes.write().await;
        remotes.retain(|r| r.name() != def.name());
        debug!(remote = %def.name(), provider = def.provider(), "Remote upserted");
        remotes.push(def);
    }

    /// Remove a remote definition by name.
    ///
    /// Returns whether a definition was present. Standalone removal is an
    /// extension over the baseline replace-only behavior.
    pub async fn remove(&self, name: &RemoteName) -> bool {
        let mut remotes = self.remotes.write().await;
        let before = remotes.len();
        remotes.retain(|r| r.name() != name);
        remotes.len() != before
    }

    /// Check whether a remote is defined.
    pub async fn contains(&self, name: &RemoteName) -> bool {
        self.remotes.read().await.iter().any(|r| r.name() == name)
    }

    /// Get a clone of a remote's definition.
    pub async fn get(&self, name: &RemoteName) -> Option<RemoteDefinition> {
        self.remotes
            .read()
            .await
            .iter()
            .find(|r| r.name() == name)
            .cloned()
    }

    /// Names of all defined remotes, in block order.
    pub async fn names(&self) -> Vec<RemoteName> {
        self.remotes
            .read()
            .await
            .iter()
            .map(|r| r.name().clone())
            .collect()
    }

    /// Number of defined remotes.
    pub async fn len(&self) -> usize {
        self.remotes.read().await.len()
    }

    /// Check if the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.remotes.read().await.is_empty()
    }

    /// Serialize the full store into the helper's stdin wire format.
    ///
    /// The returned buffer zeroizes on drop; callers pipe it into a child
    /// process and let it fall out of scope.
    pub async fn serialize(&self) -> SecretBytes {
        SecretBytes::from(render_profile(&self.remotes.read().await))
    }

    /// Import every block of a profile text, replacing same-named remotes.
    ///
    /// Used once after an interactive authorization run to capture the
    /// blocks the external tool wrote. Returns the number of imported
    /// definitions.
    ///
    /// # Errors
    /// - The text is not valid profile syntax
    pub async fn import(&self, text: &str) -> Result<usize> {
        let parsed = parse_profile(text)?;
        let count = parsed.len();
        let mut remotes = self.remotes.write().await;
        for def in parsed {
            remotes.retain(|r| r.name() != def.name());
            remotes.push(def);
        }
        info!(count, "Imported remote definitions from authorization flow");
        Ok(count)
    }

    /// Drop every definition, zeroizing field material.
    pub async fn wipe(&self) {
        // RemoteDefinition zeroizes on drop; clearing the vec is the wipe.
        self.remotes.write().await.clear();
        info!("Configuration store wiped");
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}
