// Command Parser
// Free-form chat text -> typed commands, with unknown tokens as an explicit branch

mod args;
pub mod help;
mod persona;
mod profile;

pub use persona::{parse_persona_command, PersonaCommand, PersonaFlags};
pub use profile::{parse_profile_command, ProfileCommand, RunFlags};

use crate::domain::{Language, LlmOverrides, SynthesisMode};
use args::ArgMatches;
use std::path::PathBuf;

/// Result of parsing command text.
///
/// `Invalid` carries every token that was not understood; callers show them
/// together with the help text and do nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed<T> {
    Command(T),
    Invalid { unknown: Vec<String> },
}

impl<T> Parsed<T> {
    pub fn is_invalid(&self) -> bool {
        matches!(self, Parsed::Invalid { .. })
    }
}

/// Flags both surfaces share.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommonFlags {
    /// `None` when absent or not a supported language tag
    pub language: Option<Language>,
    pub mode: Option<SynthesisMode>,
    pub agent: Option<String>,
    pub output: Option<PathBuf>,
    pub llm: LlmOverrides,
    pub no_llm: bool,
}

fn common_flags(matches: &ArgMatches, unknown: &mut Vec<String>) -> CommonFlags {
    let mode = match matches.value("mode") {
        Some(raw) => {
            let parsed = SynthesisMode::parse(raw);
            if parsed.is_none() {
                unknown.push(format!("--mode={}", raw));
            }
            parsed
        }
        None => None,
    };

    CommonFlags {
        language: matches.value("lang").and_then(Language::parse),
        mode,
        agent: matches.owned_value("agent"),
        output: matches.owned_value("output").map(PathBuf::from),
        llm: LlmOverrides {
            provider: matches.owned_value("provider"),
            model: matches.owned_value("model"),
            api_base: None,
            api_key: None,
        },
        no_llm: matches.is_set("no-llm"),
    }
}

/// Shared prelude: tokenize, match, and pull out the action word.
fn prepare(
    text: &str,
    flags: &[args::FlagSpec],
) -> Result<(Option<String>, ArgMatches), Vec<String>> {
    let tokens = args::tokenize(text).map_err(|e| vec![e])?;
    let mut matches = args::match_args(&tokens, flags);
    let action = if matches.positionals.is_empty() {
        None
    } else {
        Some(matches.positionals.remove(0))
    };
    Ok((action, matches))
}
