// Validation stage
// Structural checks on synthesized text, independent of how it was produced

use crate::application::synthesis::prompt::{IDENTITY_MARKER, SOUL_MARKER};
use crate::domain::{DocumentKind, GeneratedDocument};
use thiserror::Error;

/// Characters of raw output quoted in a validation error
const SNIPPET_CHARS: usize = 400;

const IDENTITY_FIELDS: &[&str] = &["name", "creature", "vibe", "emoji"];
const SOUL_SECTIONS: &[&str] = &["core truths", "boundaries", "vibe", "continuity"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct ValidationError {
    pub reason: String,
    /// Head of the raw output, bounded
    pub snippet: String,
}

impl ValidationError {
    fn new(reason: impl Into<String>, raw: &str) -> Self {
        Self {
            reason: reason.into(),
            snippet: snippet(raw, SNIPPET_CHARS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOutput {
    pub documents: Vec<GeneratedDocument>,
    /// Recommended content that is missing; never fatal
    pub warnings: Vec<String>,
}

/// Remove one wrapping ```` ``` ```` / ```` ```markdown ```` fence pair, if present.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some((lang, body)) = rest.split_once('\n') else {
        return trimmed;
    };
    if !matches!(
        lang.trim().to_ascii_lowercase().as_str(),
        "" | "markdown" | "md"
    ) {
        return trimmed;
    }
    match body.trim_end().strip_suffix("```") {
        Some(inner) => inner.trim(),
        None => trimmed,
    }
}

pub fn validate_profile(raw: &str) -> Result<ValidatedOutput, ValidationError> {
    let content = strip_code_fences(raw);
    if content.is_empty() {
        return Err(ValidationError::new("generated profile is empty", raw));
    }
    Ok(ValidatedOutput {
        documents: vec![GeneratedDocument {
            kind: DocumentKind::User,
            content: ensure_trailing_newline(content),
        }],
        warnings: Vec::new(),
    })
}

/// Split persona output on the two section markers.
///
/// Each marker must appear exactly once, identity first, and both sections
/// must be non-empty. Text before the first marker is dropped with a warning.
pub fn validate_persona(raw: &str) -> Result<ValidatedOutput, ValidationError> {
    let text = strip_code_fences(raw);

    for marker in [IDENTITY_MARKER, SOUL_MARKER] {
        let count = text.matches(marker).count();
        if count != 1 {
            return Err(ValidationError::new(
                format!("expected exactly one {} marker, found {}", marker, count),
                raw,
            ));
        }
    }

    // Both markers are present exactly once (checked above)
    let identity_at = text.find(IDENTITY_MARKER).unwrap_or_default();
    let soul_at = text.find(SOUL_MARKER).unwrap_or_default();
    if soul_at < identity_at {
        return Err(ValidationError::new(
            format!("{} appears before {}", SOUL_MARKER, IDENTITY_MARKER),
            raw,
        ));
    }

    let mut warnings = Vec::new();
    let preamble = text[..identity_at].trim();
    if !preamble.is_empty() {
        warnings.push(format!(
            "ignored {} characters before {}",
            preamble.chars().count(),
            IDENTITY_MARKER
        ));
    }

    let identity = strip_code_fences(&text[identity_at + IDENTITY_MARKER.len()..soul_at]);
    let soul = strip_code_fences(&text[soul_at + SOUL_MARKER.len()..]);
    if identity.is_empty() {
        return Err(ValidationError::new("IDENTITY.md section is empty", raw));
    }
    if soul.is_empty() {
        return Err(ValidationError::new("SOUL.md section is empty", raw));
    }

    let missing = missing_identity_fields(identity);
    if !missing.is_empty() {
        warnings.push(format!("IDENTITY.md is missing: {}", missing.join(", ")));
    }
    let missing = missing_soul_sections(soul);
    if !missing.is_empty() {
        warnings.push(format!("SOUL.md is missing: {}", missing.join(", ")));
    }

    Ok(ValidatedOutput {
        documents: vec![
            GeneratedDocument {
                kind: DocumentKind::Identity,
                content: ensure_trailing_newline(identity),
            },
            GeneratedDocument {
                kind: DocumentKind::Soul,
                content: ensure_trailing_newline(soul),
            },
        ],
        warnings,
    })
}

pub fn missing_identity_fields(md: &str) -> Vec<&'static str> {
    let mut found = bold_fields(md);
    found.extend(headings(md));
    IDENTITY_FIELDS
        .iter()
        .copied()
        .filter(|field| !found.iter().any(|f| f == field))
        .collect()
}

pub fn missing_soul_sections(md: &str) -> Vec<&'static str> {
    let found = headings(md);
    SOUL_SECTIONS
        .iter()
        .copied()
        .filter(|section| !found.iter().any(|h| h.starts_with(section)))
        .collect()
}

/// Markdown headings, lowercased, without the leading `#`s.
fn headings(md: &str) -> Vec<String> {
    md.lines()
        .map(str::trim)
        .filter(|line| line.starts_with('#'))
        .map(|line| line.trim_start_matches('#').trim().to_lowercase())
        .collect()
}

/// Labels written as `**Label:**` or `**Label**:`, lowercased.
fn bold_fields(md: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut rest = md;
    while let Some(open) = rest.find("**") {
        let after = &rest[open + 2..];
        let Some(close) = after.find("**") else {
            break;
        };
        let inner = &after[..close];
        let tail = &after[close + 2..];
        let label = match inner.strip_suffix(':') {
            Some(label) => Some(label),
            None if tail.starts_with(':') => Some(inner),
            None => None,
        };
        if let Some(label) = label.map(str::trim) {
            if !label.is_empty()
                && label
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_' || c.is_whitespace())
            {
                fields.push(label.to_lowercase());
            }
        }
        rest = tail;
    }
    fields
}

fn ensure_trailing_newline(content: &str) -> String {
    let mut owned = content.to_string();
    if !owned.ends_with('\n') {
        owned.push('\n');
    }
    owned
}

/// First `max_chars` characters, with an ellipsis when cut.
pub fn snippet(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}
