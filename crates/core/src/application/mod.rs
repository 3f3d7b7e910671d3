// Application Layer - Use Cases and Pipeline Stages

pub mod collect;
pub mod command;
pub mod format;
pub mod keyed_lock;
pub mod orchestrator;
pub mod service;
pub mod settings;
pub mod synthesis;
pub mod validate;

// Re-exports
pub use command::{parse_persona_command, parse_profile_command, Parsed};
pub use format::{Reply, ResponseFormatter, Surface};
pub use keyed_lock::KeyedLocks;
pub use orchestrator::Orchestrator;
pub use service::CommandService;
pub use settings::{PipelineSettings, ProgramSettings};
