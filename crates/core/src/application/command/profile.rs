// Profile command surface: add | list | clear | run | help

use super::args::{switch, value_flag, FlagSpec};
use super::{common_flags, prepare, CommonFlags, Parsed};
use crate::domain::NormalizedUrl;

const PROFILE_FLAGS: &[FlagSpec] = &[
    value_flag("lang"),
    value_flag("mode"),
    value_flag("agent"),
    value_flag("output"),
    value_flag("provider"),
    value_flag("model"),
    switch("no-llm"),
    switch("keep-queue"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFlags {
    pub common: CommonFlags,
    pub keep_queue: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileCommand {
    /// Queue links (may be empty when the user gave none)
    Add(Vec<NormalizedUrl>),
    List,
    Clear,
    /// Synthesize from the queue plus any links given inline
    Run {
        urls: Vec<NormalizedUrl>,
        flags: RunFlags,
    },
    Help,
}

/// Parse profile command text.
///
/// A first positional that is itself a link is shorthand for `add`.
/// Flags that do not apply to the chosen action are accepted and ignored.
pub fn parse_profile_command(text: &str) -> Parsed<ProfileCommand> {
    let (action, matches) = match prepare(text, PROFILE_FLAGS) {
        Ok(prepared) => prepared,
        Err(unknown) => return Parsed::Invalid { unknown },
    };
    let mut unknown = matches.unknown.clone();
    let flags = RunFlags {
        common: common_flags(&matches, &mut unknown),
        keep_queue: matches.is_set("keep-queue"),
    };

    let mut positionals = matches.positionals.clone();
    let verb = action.as_deref().map(str::to_ascii_lowercase);
    let command = match verb.as_deref() {
        None | Some("help") => {
            unknown.extend(positionals);
            ProfileCommand::Help
        }
        Some("list") => {
            unknown.extend(positionals);
            ProfileCommand::List
        }
        Some("clear") => {
            unknown.extend(positionals);
            ProfileCommand::Clear
        }
        Some("add") => ProfileCommand::Add(parse_urls(&positionals, &mut unknown)),
        Some("run") => ProfileCommand::Run {
            urls: parse_urls(&positionals, &mut unknown),
            flags,
        },
        Some(_) => {
            let first = action.unwrap_or_default();
            if NormalizedUrl::parse(&first).is_ok() {
                positionals.insert(0, first);
                ProfileCommand::Add(parse_urls(&positionals, &mut unknown))
            } else {
                unknown.push(first);
                unknown.extend(positionals);
                ProfileCommand::Help
            }
        }
    };

    if unknown.is_empty() {
        Parsed::Command(command)
    } else {
        Parsed::Invalid { unknown }
    }
}

fn parse_urls(raw: &[String], unknown: &mut Vec<String>) -> Vec<NormalizedUrl> {
    let mut urls = Vec::with_capacity(raw.len());
    for token in raw {
        match NormalizedUrl::parse(token) {
            Ok(url) => {
                if !urls.contains(&url) {
                    urls.push(url);
                }
            }
            Err(_) => unknown.push(token.clone()),
        }
    }
    urls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Language, SynthesisMode};
    use std::path::PathBuf;

    fn command(text: &str) -> ProfileCommand {
        match parse_profile_command(text) {
            Parsed::Command(c) => c,
            Parsed::Invalid { unknown } => panic!("unexpected unknown tokens: {:?}", unknown),
        }
    }

    fn unknown(text: &str) -> Vec<String> {
        match parse_profile_command(text) {
            Parsed::Invalid { unknown } => unknown,
            Parsed::Command(c) => panic!("expected invalid, got {:?}", c),
        }
    }

    #[test]
    fn test_empty_input_is_help() {
        assert_eq!(command(""), ProfileCommand::Help);
        assert_eq!(command("  HELP "), ProfileCommand::Help);
    }

    #[test]
    fn test_add_normalizes_and_dedups() {
        let ProfileCommand::Add(urls) =
            command("add https://github.com/alice https://github.com/alice/")
        else {
            panic!("expected add");
        };
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].as_str(), "https://github.com/alice");
    }

    #[test]
    fn test_bare_link_means_add() {
        let ProfileCommand::Add(urls) = command("https://example.com/me, https://b.org")
        else {
            panic!("expected add");
        };
        assert_eq!(urls.len(), 2);
    }

    #[test]
    fn test_run_flags_in_any_order() {
        let a = command("run --lang en --mode=direct --keep-queue --output ./out");
        let b = command("--output=./out --keep-queue run --mode direct --lang=en");
        assert_eq!(a, b);

        let ProfileCommand::Run { urls, flags } = a else {
            panic!("expected run");
        };
        assert!(urls.is_empty());
        assert_eq!(flags.common.language, Some(Language::En));
        assert_eq!(flags.common.mode, Some(SynthesisMode::Direct));
        assert_eq!(flags.common.output, Some(PathBuf::from("./out")));
        assert!(flags.keep_queue);
        assert!(!flags.common.no_llm);
    }

    #[test]
    fn test_run_with_overrides() {
        let ProfileCommand::Run { flags, .. } =
            command("run --provider deepseek --model 'deepseek/deepseek-chat' --no-llm")
        else {
            panic!("expected run");
        };
        assert_eq!(flags.common.llm.provider.as_deref(), Some("deepseek"));
        assert_eq!(flags.common.llm.model.as_deref(), Some("deepseek/deepseek-chat"));
        assert!(flags.common.no_llm);
    }

    #[test]
    fn test_unsupported_language_falls_back_silently() {
        let ProfileCommand::Run { flags, .. } = command("run --lang klingon") else {
            panic!("expected run");
        };
        assert_eq!(flags.common.language, None);
    }

    #[test]
    fn test_unknown_tokens_are_collected() {
        assert_eq!(unknown("add notaurl ftp://x.org"), vec!["notaurl", "ftp://x.org"]);
        assert_eq!(unknown("run --verbose"), vec!["--verbose"]);
        assert_eq!(unknown("run --mode=magic"), vec!["--mode=magic"]);
        assert_eq!(unknown("list extra"), vec!["extra"]);
        assert_eq!(unknown("frobnicate"), vec!["frobnicate"]);
        assert_eq!(unknown("run --keep-queue=yes"), vec!["--keep-queue=yes"]);
    }

    #[test]
    fn test_persona_only_flag_is_unknown_here() {
        assert_eq!(unknown("run --name Bob"), vec!["--name", "Bob"]);
    }

    #[test]
    fn test_unterminated_quote_is_invalid() {
        assert!(parse_profile_command("run --agent 'main").is_invalid());
    }
}
