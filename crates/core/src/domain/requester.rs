// Requester Key
// Isolates one user's link queue from another's

use serde::{Deserialize, Serialize};

/// Stable identifier combining channel, account and sender.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequesterKey(String);

impl RequesterKey {
    pub fn new(channel: &str, account: &str, sender: &str) -> Self {
        Self(format!(
            "{}:{}:{}",
            component(&channel.to_ascii_lowercase()),
            component(account),
            component(sender)
        ))
    }

    /// Rebuild a key from its stored form.
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequesterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn component(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "-".to_string();
    }
    // ':' is the separator; escape it so distinct triples never collide
    trimmed.replace('%', "%25").replace(':', "%3A")
}
