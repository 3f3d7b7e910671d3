//! Shared harness: real SQLite queue, real subprocesses, real installer.
//!
//! Collectors and agents are stood in for by `echo`, `true` and `sh -c`.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use wwa_core::application::{CommandService, Orchestrator, PipelineSettings};
use wwa_core::domain::RequesterKey;
use wwa_core::port::completion::mocks::ScriptedCompletionClient;
use wwa_core::port::id_provider::UuidProvider;
use wwa_core::port::time_provider::SystemTimeProvider;
use wwa_core::port::CompletionClient;
use wwa_infra_sqlite::{create_pool, run_migrations, SqliteQueueStore};
use wwa_infra_system::{FsInstaller, TokioProcessRunner};

pub struct Harness {
    pub dir: TempDir,
    pub settings: PipelineSettings,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = PipelineSettings::new(dir.path().join("workspace"));
        settings.collect_timeout = Duration::from_secs(10);
        settings.agent_timeout = Duration::from_secs(10);
        settings.direct_timeout = Duration::from_secs(10);
        settings.programs.profile_collector = "echo".to_string();
        settings.programs.persona_collector = "echo".to_string();
        settings.programs.agent = "sh".to_string();
        Self { dir, settings }
    }

    pub fn workspace(&self) -> PathBuf {
        self.settings.workspace_dir.clone()
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("queue.db")
    }

    /// Host agent replaced by `sh -c <script> sh <message>`.
    pub fn agent_script(&mut self, script: &str) {
        self.settings.programs.agent_args = vec![
            "-c".to_string(),
            script.to_string(),
            "sh".to_string(),
            "{message}".to_string(),
        ];
    }

    pub async fn service_with(&self, completion: Arc<dyn CompletionClient>) -> CommandService {
        let pool = create_pool(&self.db_path()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        let queue = SqliteQueueStore::new(pool, Arc::new(SystemTimeProvider));

        let runner =
            TokioProcessRunner::default().with_term_grace(Duration::from_millis(200));
        let orchestrator = Orchestrator::new(
            Arc::new(runner),
            completion,
            Arc::new(FsInstaller::default()),
            Arc::new(UuidProvider),
            self.settings.clone(),
        );
        CommandService::new(Arc::new(queue), Arc::new(orchestrator))
    }

    pub async fn service(&self) -> CommandService {
        self.service_with(Arc::new(ScriptedCompletionClient::replying(
            "# Profile\n\nFrom the direct call.\n",
        )))
        .await
    }
}

pub fn key() -> RequesterKey {
    RequesterKey::new("telegram", "bot", "42")
}

pub fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

/// Backup files next to `final_path` (`<NAME>.bak-*`).
pub fn backups_of(final_path: &Path) -> Vec<PathBuf> {
    let prefix = format!(
        "{}.bak-",
        final_path.file_name().unwrap().to_string_lossy()
    );
    let mut found: Vec<PathBuf> = std::fs::read_dir(final_path.parent().unwrap())
        .unwrap()
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().starts_with(&prefix))
                .unwrap_or(false)
        })
        .collect();
    found.sort();
    found
}

/// Leftover staged files in a directory.
pub fn staged_files(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.to_string_lossy().ends_with(".staged"))
            .collect(),
        Err(_) => Vec::new(),
    }
}
