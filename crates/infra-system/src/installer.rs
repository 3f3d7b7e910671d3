// Filesystem installer
// Backup, then rename the staged file over the final path
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use wwa_core::application::KeyedLocks;
use wwa_core::domain::{InstalledArtifact, StagedArtifact};
use wwa_core::port::time_provider::SystemTimeProvider;
use wwa_core::port::{ArtifactInstaller, InstallError, TimeProvider};

/// Collision suffixes tried before giving up on a backup name
const MAX_BACKUP_SUFFIX: u32 = 100;

/// Installs staged documents into the workspace.
///
/// Installs targeting the same final path are serialized within the process.
/// Across processes the last rename wins; each one still gets its own backup
/// name.
pub struct FsInstaller {
    clock: Arc<dyn TimeProvider>,
    locks: KeyedLocks<PathBuf>,
}

impl FsInstaller {
    pub fn new(clock: Arc<dyn TimeProvider>) -> Self {
        Self {
            clock,
            locks: KeyedLocks::new(),
        }
    }

    fn stamp(&self) -> String {
        chrono::DateTime::from_timestamp_millis(self.clock.now_millis())
            .unwrap_or_default()
            .format("%Y%m%d-%H%M%S")
            .to_string()
    }

    /// Copy `final_path` to a backup path that did not exist before.
    async fn backup(&self, final_path: &Path) -> Result<PathBuf, InstallError> {
        let failed = |reason: String| InstallError::BackupFailed {
            path: final_path.to_path_buf(),
            reason,
        };

        let content = fs::read(final_path)
            .await
            .map_err(|e| failed(format!("reading current file: {}", e)))?;

        let stamp = self.stamp();
        for attempt in 0..=MAX_BACKUP_SUFFIX {
            let candidate = backup_path(final_path, &stamp, attempt);
            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(failed(format!("creating {}: {}", candidate.display(), e))),
            };

            file.write_all(&content)
                .await
                .map_err(|e| failed(format!("writing {}: {}", candidate.display(), e)))?;
            file.sync_all()
                .await
                .map_err(|e| failed(format!("syncing {}: {}", candidate.display(), e)))?;

            let written = fs::metadata(&candidate)
                .await
                .map_err(|e| failed(format!("checking {}: {}", candidate.display(), e)))?
                .len();
            if written != content.len() as u64 {
                return Err(failed(format!(
                    "backup size mismatch ({} of {} bytes)",
                    written,
                    content.len()
                )));
            }

            debug!(backup = %candidate.display(), bytes = written, "Backup written");
            return Ok(candidate);
        }

        Err(failed(format!(
            "no free backup name after {} attempts",
            MAX_BACKUP_SUFFIX + 1
        )))
    }

    /// Fallback when a plain rename is refused: copy next to the target,
    /// sync, then rename that copy into place.
    async fn copy_into_place(staged: &StagedArtifact, rename_error: &str) -> Result<(), InstallError> {
        let failed = |reason: String| InstallError::MoveFailed {
            from: staged.staged_path.clone(),
            to: staged.final_path.clone(),
            reason,
        };

        let temp = installing_path(staged);
        let content = fs::read(&staged.staged_path)
            .await
            .map_err(|e| failed(format!("rename: {}; read: {}", rename_error, e)))?;

        let result = async {
            let mut file = fs::File::create(&temp).await?;
            file.write_all(&content).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&temp, &staged.final_path).await
        }
        .await;

        if let Err(e) = result {
            let _ = fs::remove_file(&temp).await;
            return Err(failed(format!("rename: {}; copy: {}", rename_error, e)));
        }

        if let Err(e) = fs::remove_file(&staged.staged_path).await {
            warn!(staged = %staged.staged_path.display(), error = %e, "Failed to remove staged file after copy");
        }
        Ok(())
    }
}

impl Default for FsInstaller {
    fn default() -> Self {
        Self::new(Arc::new(SystemTimeProvider))
    }
}

/// `.<NAME>.<id>.installing` next to the final path, unique per staged file.
fn installing_path(staged: &StagedArtifact) -> PathBuf {
    let stem = staged
        .staged_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!(".{}", staged.kind.file_name()));
    staged
        .final_path
        .with_file_name(format!("{}.installing", stem))
}

/// `<NAME>.bak-YYYYMMDD-HHMMSS`, with `-N` appended on collision.
fn backup_path(final_path: &Path, stamp: &str, attempt: u32) -> PathBuf {
    let name = final_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = if attempt == 0 {
        format!("{}.bak-{}", name, stamp)
    } else {
        format!("{}.bak-{}-{}", name, stamp, attempt)
    };
    final_path.with_file_name(file_name)
}

#[async_trait]
impl ArtifactInstaller for FsInstaller {
    async fn install(&self, staged: &StagedArtifact) -> Result<InstalledArtifact, InstallError> {
        let _guard = self.locks.lock(&staged.final_path).await;

        match fs::metadata(&staged.staged_path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(InstallError::StagedMissing(staged.staged_path.clone())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(InstallError::StagedMissing(staged.staged_path.clone()))
            }
            Err(e) => return Err(InstallError::Io(e)),
        }

        let backup_path = match fs::metadata(&staged.final_path).await {
            Ok(meta) if meta.is_dir() => {
                return Err(InstallError::TargetIsDirectory(staged.final_path.clone()))
            }
            Ok(_) => Some(self.backup(&staged.final_path).await?),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(InstallError::Io(e)),
        };

        if let Err(e) = fs::rename(&staged.staged_path, &staged.final_path).await {
            warn!(
                from = %staged.staged_path.display(),
                to = %staged.final_path.display(),
                error = %e,
                "Rename failed, copying instead"
            );
            Self::copy_into_place(staged, &e.to_string()).await?;
        }

        info!(
            document = %staged.kind,
            path = %staged.final_path.display(),
            backup = ?backup_path,
            "Document installed"
        );

        Ok(InstalledArtifact {
            final_path: staged.final_path.clone(),
            backup_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wwa_core::domain::DocumentKind;
    use wwa_core::port::time_provider::mocks::FixedTimeProvider;

    // 2026-01-01 12:00:00 UTC
    const NOON: i64 = 1_767_268_800_000;

    fn installer() -> FsInstaller {
        FsInstaller::new(Arc::new(FixedTimeProvider(NOON)))
    }

    async fn stage(dir: &Path, kind: DocumentKind, content: &str, unique: &str) -> StagedArtifact {
        let final_path = dir.join(kind.file_name());
        let staged_path = StagedArtifact::path_for(&final_path, unique);
        fs::write(&staged_path, content).await.unwrap();
        StagedArtifact {
            kind,
            staged_path,
            final_path,
        }
    }

    #[tokio::test]
    async fn test_first_install_has_no_backup() {
        let dir = tempfile::tempdir().unwrap();
        let staged = stage(dir.path(), DocumentKind::User, "new\n", "a").await;

        let installed = installer().install(&staged).await.unwrap();

        assert_eq!(installed.backup_path, None);
        assert_eq!(fs::read_to_string(&installed.final_path).await.unwrap(), "new\n");
        assert!(!staged.staged_path.exists());
    }

    #[tokio::test]
    async fn test_existing_file_is_backed_up_byte_for_byte() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("USER.md");
        fs::write(&final_path, "old profile\n").await.unwrap();
        let staged = stage(dir.path(), DocumentKind::User, "new profile\n", "a").await;

        let installed = installer().install(&staged).await.unwrap();

        let backup = installed.backup_path.unwrap();
        assert_eq!(
            backup.file_name().unwrap().to_string_lossy(),
            "USER.md.bak-20260101-120000"
        );
        assert_eq!(fs::read_to_string(&backup).await.unwrap(), "old profile\n");
        assert_eq!(fs::read_to_string(&final_path).await.unwrap(), "new profile\n");
    }

    #[tokio::test]
    async fn test_backup_names_never_collide() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("SOUL.md");
        fs::write(&final_path, "v1").await.unwrap();
        let installer = installer();

        let first = stage(dir.path(), DocumentKind::Soul, "v2", "a").await;
        let b1 = installer.install(&first).await.unwrap().backup_path.unwrap();
        let second = stage(dir.path(), DocumentKind::Soul, "v3", "b").await;
        let b2 = installer.install(&second).await.unwrap().backup_path.unwrap();

        assert_ne!(b1, b2);
        assert!(b2.to_string_lossy().ends_with("SOUL.md.bak-20260101-120000-1"));
        assert_eq!(fs::read_to_string(&b1).await.unwrap(), "v1");
        assert_eq!(fs::read_to_string(&b2).await.unwrap(), "v2");
        assert_eq!(fs::read_to_string(&final_path).await.unwrap(), "v3");
    }

    #[tokio::test]
    async fn test_missing_staged_file_leaves_target_alone() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("USER.md");
        fs::write(&final_path, "keep me").await.unwrap();
        let staged = StagedArtifact {
            kind: DocumentKind::User,
            staged_path: dir.path().join(".USER.md.gone.staged"),
            final_path: final_path.clone(),
        };

        let err = installer().install(&staged).await.unwrap_err();

        assert!(matches!(err, InstallError::StagedMissing(_)));
        assert_eq!(fs::read_to_string(&final_path).await.unwrap(), "keep me");
    }

    #[tokio::test]
    async fn test_directory_target_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("USER.md")).await.unwrap();
        let staged = stage(dir.path(), DocumentKind::User, "x", "a").await;

        let err = installer().install(&staged).await.unwrap_err();

        assert!(matches!(err, InstallError::TargetIsDirectory(_)));
        assert!(staged.staged_path.exists());
    }

    #[tokio::test]
    async fn test_concurrent_installs_keep_every_version() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("USER.md");
        fs::write(&final_path, "v0").await.unwrap();
        let installer = Arc::new(installer());

        let mut handles = Vec::new();
        for i in 1..=4 {
            let staged = stage(dir.path(), DocumentKind::User, &format!("v{}", i), &i.to_string()).await;
            let installer = installer.clone();
            handles.push(tokio::spawn(async move { installer.install(&staged).await }));
        }

        let mut backups = Vec::new();
        for handle in handles {
            let installed = handle.await.unwrap().unwrap();
            backups.push(installed.backup_path.unwrap());
        }

        // Four distinct backups holding v0 plus three of v1..v4; the fourth is live
        let mut contents: Vec<String> = Vec::new();
        for backup in &backups {
            contents.push(fs::read_to_string(backup).await.unwrap());
        }
        contents.push(fs::read_to_string(&final_path).await.unwrap());
        contents.sort();
        assert_eq!(contents, vec!["v0", "v1", "v2", "v3", "v4"]);
    }

    fn leftovers(dir: &Path, suffix: &str) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(suffix))
            .collect()
    }

    #[tokio::test]
    async fn test_copy_fallback_replaces_target_via_rename() {
        let staging_dir = tempfile::tempdir().unwrap();
        let workspace = tempfile::tempdir().unwrap();
        let mut staged = stage(staging_dir.path(), DocumentKind::User, "new bytes\n", "c1").await;
        staged.final_path = workspace.path().join("USER.md");
        fs::write(&staged.final_path, "old bytes\n").await.unwrap();

        FsInstaller::copy_into_place(&staged, "cross-device link")
            .await
            .unwrap();

        assert_eq!(
            fs::read_to_string(&staged.final_path).await.unwrap(),
            "new bytes\n"
        );
        assert!(!staged.staged_path.exists());
        assert!(leftovers(workspace.path(), ".installing").is_empty());
    }

    #[tokio::test]
    async fn test_failed_copy_leaves_target_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("USER.md");
        fs::write(&final_path, "prior").await.unwrap();
        let staged = stage(dir.path(), DocumentKind::User, "new", "c2").await;

        // Occupy the temp name so the copy cannot be created
        fs::create_dir(installing_path(&staged)).await.unwrap();
        let err = FsInstaller::copy_into_place(&staged, "cross-device link")
            .await
            .unwrap_err();

        assert!(matches!(err, InstallError::MoveFailed { .. }));
        assert!(err.to_string().contains("cross-device link"));
        assert_eq!(fs::read_to_string(&final_path).await.unwrap(), "prior");
        assert!(staged.staged_path.exists());

        // Unreadable staged file: nothing is attempted
        fs::remove_file(&staged.staged_path).await.unwrap();
        assert!(FsInstaller::copy_into_place(&staged, "cross-device link")
            .await
            .is_err());
        assert_eq!(fs::read_to_string(&final_path).await.unwrap(), "prior");
    }

    #[test]
    fn test_installing_path_is_unique_per_staged_file() {
        let final_path = Path::new("/ws/USER.md");
        let a = StagedArtifact {
            kind: DocumentKind::User,
            staged_path: StagedArtifact::path_for(final_path, "aaa"),
            final_path: final_path.to_path_buf(),
        };
        let b = StagedArtifact {
            staged_path: StagedArtifact::path_for(final_path, "bbb"),
            ..a.clone()
        };

        assert_eq!(installing_path(&a), Path::new("/ws/.USER.md.aaa.installing"));
        assert_ne!(installing_path(&a), installing_path(&b));
    }
}
