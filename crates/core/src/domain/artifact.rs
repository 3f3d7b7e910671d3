// Artifact Domain Model

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which pipeline produced an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Profile,
    Persona,
}

impl ArtifactKind {
    pub fn documents(&self) -> &'static [DocumentKind] {
        match self {
            ArtifactKind::Profile => &[DocumentKind::User],
            ArtifactKind::Persona => &[DocumentKind::Identity, DocumentKind::Soul],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ArtifactKind::Profile => "profile",
            ArtifactKind::Persona => "persona",
        }
    }
}

/// Workspace documents this system writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    User,
    Identity,
    Soul,
}

impl DocumentKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            DocumentKind::User => "USER.md",
            DocumentKind::Identity => "IDENTITY.md",
            DocumentKind::Soul => "SOUL.md",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_name())
    }
}

/// A validated document ready to be staged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDocument {
    pub kind: DocumentKind,
    pub content: String,
}

/// A generated file at its temporary path, not yet visible under its final name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedArtifact {
    pub kind: DocumentKind,
    pub staged_path: PathBuf,
    pub final_path: PathBuf,
}

impl StagedArtifact {
    /// Hidden sibling of the final path, unique per invocation.
    ///
    /// Staging next to the target keeps the final rename on one volume.
    pub fn path_for(final_path: &Path, unique: &str) -> PathBuf {
        let name = final_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "artifact".to_string());
        final_path.with_file_name(format!(".{}.{}.staged", name, unique))
    }
}

/// A file at its final path plus the backup of whatever it replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledArtifact {
    pub final_path: PathBuf,
    pub backup_path: Option<PathBuf>,
}
