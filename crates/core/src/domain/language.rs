// Output Language

use serde::{Deserialize, Serialize};

/// Language of the generated documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Zh,
    En,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Zh, Language::En];

    /// Parse a user-supplied tag. Accepts a few common aliases.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "zh" | "zh-cn" | "zh_cn" | "zh-hans" | "cn" | "chinese" | "中文" => Some(Language::Zh),
            "en" | "en-us" | "en_us" | "en-gb" | "english" => Some(Language::En),
            _ => None,
        }
    }

    /// Resolve an optional tag, falling back to `default` for missing or unknown tags.
    pub fn resolve(tag: Option<&str>, default: Language) -> Self {
        tag.and_then(Self::parse).unwrap_or(default)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Zh => "zh",
            Language::En => "en",
        }
    }

    /// Human-readable name used inside instruction templates.
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Zh => "Simplified Chinese",
            Language::En => "English",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
