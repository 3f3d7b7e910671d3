// Artifact Installer Port
// Moves staged files into place without ever dropping the previous version

use crate::domain::{InstalledArtifact, StagedArtifact};
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Installation errors
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("Staged file missing: {0}")]
    StagedMissing(PathBuf),

    #[error("Target is a directory: {0}")]
    TargetIsDirectory(PathBuf),

    #[error("Backup of {path} failed: {reason}")]
    BackupFailed { path: PathBuf, reason: String },

    #[error("Moving {from} to {to} failed: {reason}")]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Artifact Installer trait
///
/// Guarantees:
/// - an existing final file is copied to a fresh backup path before it is replaced
/// - the final path only ever changes through a rename (no partial content visible)
/// - on error nothing is claimed; the staged file is left for the caller to remove
/// - backups are never deleted
#[async_trait]
pub trait ArtifactInstaller: Send + Sync {
    async fn install(&self, staged: &StagedArtifact) -> Result<InstalledArtifact, InstallError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Renames staged files into place (no backups) and can be told to fail
    /// for one document file name.
    #[derive(Default)]
    pub struct RenamingInstaller {
        fail_for: Option<String>,
        installed: Mutex<Vec<PathBuf>>,
    }

    impl RenamingInstaller {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_for(file_name: &str) -> Self {
            Self {
                fail_for: Some(file_name.to_string()),
                installed: Mutex::new(Vec::new()),
            }
        }

        pub fn installed(&self) -> Vec<PathBuf> {
            self.installed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ArtifactInstaller for RenamingInstaller {
        async fn install(
            &self,
            staged: &StagedArtifact,
        ) -> Result<InstalledArtifact, InstallError> {
            if self.fail_for.as_deref() == Some(staged.kind.file_name()) {
                return Err(InstallError::MoveFailed {
                    from: staged.staged_path.clone(),
                    to: staged.final_path.clone(),
                    reason: "simulated failure".to_string(),
                });
            }
            tokio::fs::rename(&staged.staged_path, &staged.final_path).await?;
            self.installed
                .lock()
                .unwrap()
                .push(staged.final_path.clone());
            Ok(InstalledArtifact {
                final_path: staged.final_path.clone(),
                backup_path: None,
            })
        }
    }
}
