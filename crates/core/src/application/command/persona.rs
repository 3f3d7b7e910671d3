// Persona command surface: prompt | template | reference | help

use super::args::{switch, value_flag, FlagSpec};
use super::{common_flags, prepare, CommonFlags, Parsed};
use crate::domain::PersonaMode;

const PERSONA_FLAGS: &[FlagSpec] = &[
    value_flag("lang"),
    value_flag("mode"),
    value_flag("agent"),
    value_flag("output"),
    value_flag("provider"),
    value_flag("model"),
    value_flag("name"),
    switch("no-llm"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonaFlags {
    pub common: CommonFlags,
    /// Name to give the generated agent
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonaCommand {
    /// The mode's text may be blank; request construction rejects it
    Generate { mode: PersonaMode, flags: PersonaFlags },
    Help,
}

/// Parse persona command text.
///
/// Everything after the action word is the description (or template /
/// reference name), so quoting multi-word input is optional.
pub fn parse_persona_command(text: &str) -> Parsed<PersonaCommand> {
    let (action, matches) = match prepare(text, PERSONA_FLAGS) {
        Ok(prepared) => prepared,
        Err(unknown) => return Parsed::Invalid { unknown },
    };
    let mut unknown = matches.unknown.clone();
    let flags = PersonaFlags {
        common: common_flags(&matches, &mut unknown),
        name: matches.owned_value("name"),
    };

    let text = matches.positionals.join(" ");
    let verb = action.as_deref().map(str::to_ascii_lowercase);
    let command = match verb.as_deref() {
        None | Some("help") => {
            unknown.extend(matches.positionals.iter().cloned());
            PersonaCommand::Help
        }
        Some("prompt") => PersonaCommand::Generate {
            mode: PersonaMode::Prompt(text),
            flags,
        },
        Some("template") => PersonaCommand::Generate {
            mode: PersonaMode::Template(text),
            flags,
        },
        Some("reference") => PersonaCommand::Generate {
            mode: PersonaMode::Reference(text),
            flags,
        },
        Some(_) => {
            unknown.push(action.unwrap_or_default());
            unknown.extend(matches.positionals.iter().cloned());
            PersonaCommand::Help
        }
    };

    if unknown.is_empty() {
        Parsed::Command(command)
    } else {
        Parsed::Invalid { unknown }
    }
}
