// Port Layer - Interfaces for external dependencies

pub mod completion;
pub mod id_provider; // For deterministic testing
pub mod installer;
pub mod process_runner;
pub mod queue_store;
pub mod time_provider;

// Re-exports
pub use completion::{CompletionClient, CompletionError, CompletionRequest};
pub use id_provider::IdProvider;
pub use installer::{ArtifactInstaller, InstallError};
pub use process_runner::{CommandRunResult, CommandSpec, ProcessRunner, RunStatus};
pub use queue_store::{AddOutcome, QueueStore};
pub use time_provider::TimeProvider;
