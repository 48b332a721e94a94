//! Presentation-boundary status values.

use serde::Serialize;

use stratus_common::{DriveLetter, Error, RemoteName, Result};

/// Mount state of one remote, as shown to the user.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MountStatus {
    /// The remote is live at the given mount point.
    Mounted { mount_point: DriveLetter },
    /// The remote has no live session.
    Unmounted,
    /// A mount attempt failed; any optimistic UI state reverts.
    MountFailed { reason: String },
    /// No mount points are left for this run.
    PoolExhausted,
}

impl MountStatus {
    /// Translate a mount result into a status value.
    ///
    /// A cancelled authorization maps to `Unmounted`: the mount was simply
    /// not performed, and the UI reverts without an error surface.
    pub fn from_mount_result(result: &Result<DriveLetter>) -> Self {
        match result {
            Ok(letter) => Self::Mounted {
                mount_point: *letter,
            },
            Err(Error::PoolExhausted) => Self::PoolExhausted,
            Err(Error::AuthorizationCancelled) => Self::Unmounted,
            Err(e) => Self::MountFailed {
                reason: e.to_string(),
            },
        }
    }
}

/// One status change, posted on the facade's event channel.
#[derive(Debug, Clone, Serialize)]
pub struct StatusEvent {
    pub remote: RemoteName,
    pub status: MountStatus,
}

/// Remote listing entry for presentation layers.
#[derive(Debug, Clone, Serialize)]
pub struct RemoteInfo {
    pub name: String,
    pub provider: String,
    pub is_mounted: bool,
    pub mount_point: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mounted_from_ok() {
        let result = Ok(DriveLetter::new('Z').unwrap());
        assert!(matches!(
            MountStatus::from_mount_result(&result),
            MountStatus::Mounted { .. }
        ));
    }

    #[test]
    fn test_cancelled_authorization_reads_as_unmounted() {
        let result: Result<DriveLetter> = Err(Error::AuthorizationCancelled);
        assert!(matches!(
            MountStatus::from_mount_result(&result),
            MountStatus::Unmounted
        ));
    }

    #[test]
    fn test_pool_exhaustion_is_its_own_status() {
        let result: Result<DriveLetter> = Err(Error::PoolExhausted);
        assert!(matches!(
            MountStatus::from_mount_result(&result),
            MountStatus::PoolExhausted
        ));
    }

    #[test]
    fn test_spawn_failure_reads_as_mount_failed() {
        let result: Result<DriveLetter> = Err(Error::Spawn("missing".to_string()));
        match MountStatus::from_mount_result(&result) {
            MountStatus::MountFailed { reason } => assert!(reason.contains("missing")),
            other => panic!("unexpected status: {:?}", other),
        }
    }

    #[test]
    fn test_status_serializes_for_front_ends() {
        let status = MountStatus::Mounted {
            mount_point: DriveLetter::new('Z').unwrap(),
        };
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("mounted"));
    }
}
