// Argument matching shared by both command surfaces

use std::collections::{HashMap, HashSet};

/// A recognized `--flag`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FlagSpec {
    pub name: &'static str,
    pub takes_value: bool,
}

pub(crate) const fn value_flag(name: &'static str) -> FlagSpec {
    FlagSpec {
        name,
        takes_value: true,
    }
}

pub(crate) const fn switch(name: &'static str) -> FlagSpec {
    FlagSpec {
        name,
        takes_value: false,
    }
}

/// Tokens split into positionals, flag values and unknown tokens.
#[derive(Debug, Default)]
pub(crate) struct ArgMatches {
    pub positionals: Vec<String>,
    values: HashMap<&'static str, String>,
    switches: HashSet<&'static str>,
    pub unknown: Vec<String>,
}

impl ArgMatches {
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn owned_value(&self, name: &str) -> Option<String> {
        self.value(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.switches.contains(name)
    }
}

/// Split command text with shell-word rules (quotes, escapes).
pub(crate) fn tokenize(text: &str) -> Result<Vec<String>, String> {
    shell_words::split(text).map_err(|e| format!("{} in: {}", e, text.trim()))
}

/// Match tokens against the flag vocabulary.
///
/// `--flag value` and `--flag=value` are equivalent, flags may appear anywhere,
/// and a repeated value flag keeps its last value. Everything after a bare `--`
/// is positional.
pub(crate) fn match_args(tokens: &[String], flags: &[FlagSpec]) -> ArgMatches {
    let mut matches = ArgMatches::default();
    let mut iter = tokens.iter().peekable();
    let mut only_positionals = false;

    while let Some(token) = iter.next() {
        if only_positionals || !token.starts_with("--") || token.len() == 2 {
            if token == "--" && !only_positionals {
                only_positionals = true;
                continue;
            }
            matches.positionals.push(token.clone());
            continue;
        }

        let (name, inline) = match token[2..].split_once('=') {
            Some((n, v)) => (n, Some(v.to_string())),
            None => (&token[2..], None),
        };
        let lowered = name.to_ascii_lowercase();

        let Some(spec) = flags.iter().find(|f| f.name == lowered) else {
            matches.unknown.push(token.clone());
            continue;
        };

        if !spec.takes_value {
            if inline.is_some() {
                matches.unknown.push(token.clone());
            } else {
                matches.switches.insert(spec.name);
            }
            continue;
        }

        let value = match inline {
            Some(v) => Some(v),
            None => match iter.peek() {
                Some(next) if !next.starts_with("--") => iter.next().cloned(),
                _ => None,
            },
        };
        match value {
            Some(v) => {
                matches.values.insert(spec.name, v);
            }
            None => matches.unknown.push(token.clone()),
        }
    }

    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLAGS: &[FlagSpec] = &[value_flag("lang"), switch("no-llm")];

    fn toks(s: &str) -> Vec<String> {
        tokenize(s).unwrap()
    }

    #[test]
    fn test_inline_and_separate_values_are_equivalent() {
        let a = match_args(&toks("run --lang=en"), FLAGS);
        let b = match_args(&toks("--lang en run"), FLAGS);
        assert_eq!(a.value("lang"), Some("en"));
        assert_eq!(b.value("lang"), Some("en"));
        assert_eq!(a.positionals, b.positionals);
    }

    #[test]
    fn test_quoted_values() {
        let m = match_args(&toks(r#"prompt "a cat that 'codes'" --lang 'en'"#), FLAGS);
        assert_eq!(m.positionals, vec!["prompt", "a cat that 'codes'"]);
        assert_eq!(m.value("lang"), Some("en"));
    }

    #[test]
    fn test_unknown_and_malformed_flags() {
        let m = match_args(&toks("run --bogus --no-llm=yes --lang"), FLAGS);
        assert_eq!(m.unknown, vec!["--bogus", "--no-llm=yes", "--lang"]);
        assert!(!m.is_set("no-llm"));
    }

    #[test]
    fn test_double_dash_ends_flags() {
        let m = match_args(&toks("prompt -- --lang is part of text"), FLAGS);
        assert_eq!(m.positionals, vec!["prompt", "--lang", "is", "part", "of", "text"]);
        assert!(m.unknown.is_empty());
    }

    #[test]
    fn test_unterminated_quote_is_error() {
        assert!(tokenize("prompt \"oops").is_err());
    }
}
