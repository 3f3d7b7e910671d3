// Instruction templates
// Fixed wording; only the language and the optional agent name vary

use crate::domain::{ArtifactKind, Language};

pub const IDENTITY_MARKER: &str = "<<<IDENTITY.md>>>";
pub const SOUL_MARKER: &str = "<<<SOUL.md>>>";

const PROFILE_INSTRUCTIONS: &str = "\
You are writing USER.md, the file an AI assistant reads to understand the person it works for.
The material below was scraped from that person's public profiles and posts.

Write a concise Markdown profile with these sections:
- Basics (name or handle, location, languages, time zone if evident)
- Work & Expertise
- Interests
- Communication Style
- Notes for the Assistant (how to help this person well)

Rules:
1. Only state what the material supports. Do not invent facts.
2. Leave out contact details, addresses and anything sensitive.
3. Output plain Markdown. Do not wrap it in a code block. Do not add commentary before or after.";

const PERSONA_INSTRUCTIONS: &str = "\
You are an AI agent persona designer. From the persona spec below, write two files.

IDENTITY.md is a short identity card. It must contain the fields
**Name:**, **Creature:**, **Vibe:** (2-4 keywords) and **Emoji:**, and may add
Avatar, Origin or Catchphrase when the spec supports them.

SOUL.md defines the persona's core. It must contain the sections
## Core Truths (3-6 concrete principles), ## Boundaries (including not leaking the
user's private data and not running dangerous operations), ## Vibe (one paragraph
on tone) and ## Continuity (how to stay consistent across sessions).
SOUL.md must match the identity in IDENTITY.md.

Output format, exactly:
<<<IDENTITY.md>>>
(IDENTITY.md content)
<<<SOUL.md>>>
(SOUL.md content)

Use each marker exactly once, on its own line, in that order. Output plain
Markdown, no code blocks, nothing before the first marker.";

/// Instructions for one artifact kind, used as the system message of a direct
/// call and as the head of the agent message.
pub fn instructions(kind: ArtifactKind, language: Language, name: Option<&str>) -> String {
    let body = match kind {
        ArtifactKind::Profile => PROFILE_INSTRUCTIONS,
        ArtifactKind::Persona => PERSONA_INSTRUCTIONS,
    };
    let mut text = format!("{}\n\nWrite the content in {}.", body, language.display_name());
    if let Some(name) = name {
        text.push_str(&format!(" The agent's name is \"{}\".", name));
    }
    text
}

/// Full message for the host agent: instructions, then the collected material.
pub fn agent_message(
    kind: ArtifactKind,
    language: Language,
    name: Option<&str>,
    collected: &str,
) -> String {
    let heading = match kind {
        ArtifactKind::Profile => "Collected profile data",
        ArtifactKind::Persona => "Persona spec",
    };
    format!(
        "{}\nReply with the file content only; do not write any files yourself.\n\n## {}\n\n{}",
        instructions(kind, language, name),
        heading,
        collected
    )
}
