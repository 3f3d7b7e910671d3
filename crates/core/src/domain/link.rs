// Link Domain Model
// Canonical URL form used as the dedup key of the link queue

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Trailing characters that chat clients commonly glue onto pasted links.
const TRAILING_NOISE: &[char] = &[
    '.', ',', ';', ':', '!', '?', '\'', '"', '>', '`', '。', '，', '；', '：', '！', '？', '、',
    '）', '】', '」', '』', '》', '…',
];

/// Upper bound on re-normalization passes
const MAX_NORMALIZE_PASSES: usize = 8;

/// Leading wrappers (`<https://...>`, `"https://..."`).
const LEADING_NOISE: &[char] = &['<', '"', '\'', '`', '（', '「', '『', '《'];

/// A URL in canonical form. Two inputs that normalize to the same string are the same link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedUrl(String);

impl NormalizedUrl {
    /// Normalize raw user input.
    pub fn parse(raw: &str) -> Result<Self> {
        normalize_url(raw).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Host part, used for display ("github.com").
    pub fn host(&self) -> Option<String> {
        Url::parse(&self.0)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }
}

impl std::fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize a URL to its canonical string.
///
/// Steps: trim, strip wrapping/trailing punctuation, parse, require http(s) and a host,
/// drop the fragment, drop trailing slashes. Repeated until the result is
/// stable, since dropping a fragment or slash can expose more trailing noise.
pub fn normalize_url(raw: &str) -> Result<String> {
    let mut canonical = normalize_once(raw)?;
    for _ in 0..MAX_NORMALIZE_PASSES {
        match normalize_once(&canonical) {
            Ok(next) if next != canonical => canonical = next,
            _ => break,
        }
    }
    Ok(canonical)
}

fn normalize_once(raw: &str) -> Result<String> {
    let cleaned = strip_noise(raw);
    if cleaned.is_empty() {
        return Err(invalid(raw, "empty"));
    }

    let mut url = Url::parse(cleaned).map_err(|e| invalid(raw, &e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(raw, &format!("unsupported scheme '{}'", other))),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid(raw, "missing host"));
    }

    url.set_fragment(None);

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        url.set_path(if trimmed.is_empty() { "/" } else { trimmed });
    }

    let mut canonical = String::from(url.as_str());
    // Root URLs render without the slash the parser always adds
    if url.path() == "/" && url.query().is_none() && canonical.ends_with('/') {
        canonical.pop();
    }

    Ok(canonical)
}

fn strip_noise(raw: &str) -> &str {
    let mut s = raw.trim().trim_start_matches(LEADING_NOISE);
    loop {
        let Some(last) = s.chars().last() else {
            break;
        };
        let strip = TRAILING_NOISE.contains(&last)
            || (last == ')' && s.matches('(').count() < s.matches(')').count())
            || (last == ']' && s.matches('[').count() < s.matches(']').count())
            || (last == '}' && s.matches('{').count() < s.matches('}').count());
        if !strip {
            break;
        }
        s = &s[..s.len() - last.len_utf8()];
        s = s.trim_end();
    }
    s
}

fn invalid(input: &str, reason: &str) -> DomainError {
    DomainError::InvalidUrl {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

/// Ordered set of normalized URLs (insertion order, no duplicates).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkSet(Vec<NormalizedUrl>);

impl LinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a link; returns false when it was already present.
    pub fn insert(&mut self, url: NormalizedUrl) -> bool {
        if self.0.contains(&url) {
            return false;
        }
        self.0.push(url);
        true
    }

    /// Insert many links; returns how many were new.
    pub fn extend<I: IntoIterator<Item = NormalizedUrl>>(&mut self, urls: I) -> usize {
        urls.into_iter().filter(|u| self.insert(u.clone())).count()
    }

    /// Build from stored strings, dropping items that no longer normalize.
    pub fn from_stored<I, S>(items: I) -> (Self, usize)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        let mut dropped = 0;
        for item in items {
            match NormalizedUrl::parse(item.as_ref()) {
                Ok(url) => {
                    set.insert(url);
                }
                Err(_) => dropped += 1,
            }
        }
        (set, dropped)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NormalizedUrl> {
        self.0.iter()
    }

    pub fn contains(&self, url: &NormalizedUrl) -> bool {
        self.0.contains(url)
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|u| u.as_str().to_string()).collect()
    }
}

impl FromIterator<NormalizedUrl> for LinkSet {
    fn from_iter<T: IntoIterator<Item = NormalizedUrl>>(iter: T) -> Self {
        let mut set = LinkSet::new();
        set.extend(iter);
        set
    }
}

impl IntoIterator for LinkSet {
    type Item = NormalizedUrl;
    type IntoIter = std::vec::IntoIter<NormalizedUrl>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
