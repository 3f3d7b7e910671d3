// Domain Layer - Pure business logic and entities

pub mod artifact;
pub mod error;
pub mod language;
pub mod link;
pub mod outcome;
pub mod request;
pub mod requester;

// Re-exports
pub use artifact::{ArtifactKind, DocumentKind, GeneratedDocument, InstalledArtifact, StagedArtifact};
pub use error::DomainError;
pub use language::Language;
pub use link::{normalize_url, LinkSet, NormalizedUrl};
pub use outcome::{
    AttemptRecord, FailureStage, PipelineFailure, PipelineOutcome, PipelineSuccess, StrategyKind,
    SuccessGrade,
};
pub use request::{
    LlmOverrides, PersonaMode, PersonaRequest, ProfileRequest, Request, SynthesisMode,
    SynthesisOptions,
};
pub use requester::RequesterKey;
