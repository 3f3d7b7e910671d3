//! OpenClaw agent workspace resolution.
//!
//! Order: config file `agents.defaults.workspace`, then `OPENCLAW_PROFILE`
//! (`~/.openclaw/workspace-<profile>`), then `~/.openclaw/workspace`.
//! `~` honours `OPENCLAW_HOME`.

use std::path::{Path, PathBuf};
use tracing::debug;

const STATE_DIRNAME: &str = ".openclaw";
const LEGACY_STATE_DIRNAMES: &[&str] = &[".clawdbot", ".moltbot", ".moldbot"];
const CONFIG_FILENAMES: &[&str] = &[
    "openclaw.json",
    "clawdbot.json",
    "moltbot.json",
    "moldbot.json",
];

/// Environment lookup; trimmed, empty values count as unset.
pub trait Env {
    fn get(&self, name: &str) -> Option<String>;
}

/// The real process environment.
pub struct ProcessEnv;

impl Env for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

fn expand_with_home(raw: &str, home: &Path) -> PathBuf {
    let expanded = shellexpand::tilde_with_context(raw.trim(), || {
        Some(home.to_string_lossy().into_owned())
    })
    .into_owned();
    let path = PathBuf::from(expanded);
    if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(&path))
            .unwrap_or(path)
    }
}

/// `OPENCLAW_HOME`, or the user's home directory.
pub fn resolve_home(env: &dyn Env, user_home: &Path) -> PathBuf {
    match env.get("OPENCLAW_HOME") {
        Some(explicit) => expand_with_home(&explicit, user_home),
        None => user_home.to_path_buf(),
    }
}

fn state_dirs(home: &Path) -> Vec<PathBuf> {
    std::iter::once(STATE_DIRNAME)
        .chain(LEGACY_STATE_DIRNAMES.iter().copied())
        .map(|name| home.join(name))
        .collect()
}

/// First existing OpenClaw config file, searching every state dir and file name.
pub fn find_config_path(env: &dyn Env, home: &Path) -> Option<PathBuf> {
    let explicit = env
        .get("OPENCLAW_CONFIG_PATH")
        .or_else(|| env.get("CLAWDBOT_CONFIG_PATH"));
    if let Some(explicit) = explicit {
        let path = expand_with_home(&explicit, home);
        return path.is_file().then_some(path);
    }

    state_dirs(home)
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}

/// `agents.defaults.workspace` from the config file, if set.
fn configured_workspace(path: &Path) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    let value: serde_json::Value = serde_json::from_str(&text).ok()?;
    value
        .pointer("/agents/defaults/workspace")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn resolve_workspace(env: &dyn Env, user_home: &Path) -> PathBuf {
    let home = resolve_home(env, user_home);

    if let Some(config_path) = find_config_path(env, &home) {
        if let Some(raw) = configured_workspace(&config_path) {
            debug!(config = %config_path.display(), workspace = %raw, "Workspace from OpenClaw config");
            return expand_with_home(&raw, &home);
        }
    }

    match env.get("OPENCLAW_PROFILE") {
        Some(profile) if !profile.eq_ignore_ascii_case("default") => home
            .join(STATE_DIRNAME)
            .join(format!("workspace-{}", profile)),
        _ => home.join(STATE_DIRNAME).join("workspace"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeEnv(HashMap<String, String>);

    impl FakeEnv {
        fn with(mut self, name: &str, value: &str) -> Self {
            self.0.insert(name.to_string(), value.to_string());
            self
        }
    }

    impl Env for FakeEnv {
        fn get(&self, name: &str) -> Option<String> {
            self.0
                .get(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }
    }

    #[test]
    fn test_default_workspace() {
        let home = tempfile::tempdir().unwrap();
        let ws = resolve_workspace(&FakeEnv::default(), home.path());
        assert_eq!(ws, home.path().join(".openclaw/workspace"));
    }

    #[test]
    fn test_profile_workspace() {
        let home = tempfile::tempdir().unwrap();
        let env = FakeEnv::default().with("OPENCLAW_PROFILE", "work");
        assert_eq!(
            resolve_workspace(&env, home.path()),
            home.path().join(".openclaw/workspace-work")
        );

        let env = FakeEnv::default().with("OPENCLAW_PROFILE", "Default");
        assert_eq!(
            resolve_workspace(&env, home.path()),
            home.path().join(".openclaw/workspace")
        );
    }

    #[test]
    fn test_openclaw_home_override() {
        let user_home = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let env = FakeEnv::default().with("OPENCLAW_HOME", &other.path().to_string_lossy());
        assert_eq!(resolve_home(&env, user_home.path()), other.path());

        let env = FakeEnv::default().with("OPENCLAW_HOME", "   ");
        assert_eq!(resolve_home(&env, user_home.path()), user_home.path());

        let env = FakeEnv::default().with("OPENCLAW_HOME", "~/custom");
        assert_eq!(
            resolve_home(&env, user_home.path()),
            user_home.path().join("custom")
        );
    }

    #[test]
    fn test_config_in_legacy_state_dir() {
        let home = tempfile::tempdir().unwrap();
        std::fs::create_dir(home.path().join(".openclaw")).unwrap();
        let legacy = home.path().join(".moltbot");
        std::fs::create_dir(&legacy).unwrap();
        std::fs::write(
            legacy.join("clawdbot.json"),
            r#"{"agents": {"defaults": {"workspace": "~/agents/main"}}}"#,
        )
        .unwrap();

        let ws = resolve_workspace(&FakeEnv::default(), home.path());
        assert_eq!(ws, home.path().join("agents/main"));
    }

    #[test]
    fn test_explicit_config_path() {
        let home = tempfile::tempdir().unwrap();
        let cfg = home.path().join("custom.json");
        std::fs::write(&cfg, r#"{"agents": {"defaults": {"workspace": "/srv/ws"}}}"#).unwrap();

        let env = FakeEnv::default().with("OPENCLAW_CONFIG_PATH", &cfg.to_string_lossy());
        assert_eq!(resolve_workspace(&env, home.path()), PathBuf::from("/srv/ws"));

        // A missing explicit file disables the search entirely
        let env = FakeEnv::default().with("CLAWDBOT_CONFIG_PATH", "/nonexistent/x.json");
        assert_eq!(find_config_path(&env, home.path()), None);
    }

    #[test]
    fn test_unusable_config_falls_through() {
        let home = tempfile::tempdir().unwrap();
        let state = home.path().join(".openclaw");
        std::fs::create_dir(&state).unwrap();
        std::fs::write(state.join("openclaw.json"), "not json").unwrap();

        assert_eq!(
            resolve_workspace(&FakeEnv::default(), home.path()),
            home.path().join(".openclaw/workspace")
        );
    }
}
