// Help text for both command surfaces

pub const PROFILE_HELP: &str = "\
Usage: whoami <action> [links...] [flags]

Actions:
  add <link>...     Queue links (a bare link also works)
  list              Show queued links
  clear             Drop all queued links
  run [link]...     Generate USER.md from the queue plus any links given
  help              Show this help

Flags (run):
  --lang <zh|en>          Output language
  --mode <agent|direct>   Synthesis path (agent falls back to direct)
  --agent <id>            Target agent for agent mode
  --output <path>         File or directory to write USER.md to
  --provider <name>       Provider for direct mode
  --model <name>          Model for direct mode
  --no-llm                Only collect; show the scraped text
  --keep-queue            Keep the queue after a successful run";

pub const PERSONA_HELP: &str = "\
Usage: whoareu <action> <text> [flags]

Actions:
  prompt <description>   Describe the persona in your own words
  template <name>        Start from a built-in template
                         (professional, casual, otaku, minimalist, chaotic)
  reference <character>  Model the persona on a known character
  help                   Show this help

Flags:
  --name <name>           Name of the agent
  --lang <zh|en>          Output language
  --mode <agent|direct>   Synthesis path (agent falls back to direct)
  --agent <id>            Target agent for agent mode
  --output <dir>          Directory to write IDENTITY.md and SOUL.md to
  --provider <name>       Provider for direct mode
  --model <name>          Model for direct mode
  --no-llm                Only show the collected persona spec";
