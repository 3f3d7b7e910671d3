// wwa Infrastructure - System Adapters
// Implements: ProcessRunner, ArtifactInstaller

pub mod installer;
pub mod process_runner;

pub use installer::FsInstaller;
pub use process_runner::TokioProcessRunner;
