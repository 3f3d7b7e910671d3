// HTTP Completion Client
// OpenAI-compatible POST {api_base}/chat/completions

use crate::providers::{
    get_provider, provider_names, strip_routing_prefix, DEFAULT_API_BASE, DEFAULT_MODEL,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use wwa_core::domain::LlmOverrides;
use wwa_core::port::{CompletionClient, CompletionError, CompletionRequest};

/// Characters of an error body kept in `CompletionError::Http`
const MAX_ERROR_BODY_CHARS: usize = 2000;

/// Connection settings from the config file's `[llm]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LlmSettings {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub api_base: Option<String>,
    pub api_key: Option<String>,
}

/// Endpoint, model and key one call will use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub provider: Option<String>,
    /// Model as sent on the wire (routing prefix removed)
    pub model: String,
    pub api_base: String,
    pub api_key: Option<String>,
}

impl ResolvedTarget {
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn pick(candidates: &[Option<String>]) -> Option<String> {
    candidates
        .iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

impl LlmSettings {
    /// Resolve one field at a time: per-request overrides, then these settings,
    /// then `WWA_*` variables, then the provider's defaults.
    pub fn resolve(
        &self,
        overrides: &LlmOverrides,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<ResolvedTarget, CompletionError> {
        let provider_name = pick(&[
            overrides.provider.clone(),
            self.provider.clone(),
            env("WWA_PROVIDER"),
        ]);
        let provider = match &provider_name {
            Some(name) => Some(get_provider(name).ok_or_else(|| {
                CompletionError::UnknownProvider {
                    name: name.clone(),
                    available: provider_names().join(", "),
                }
            })?),
            None => None,
        };

        let model = pick(&[overrides.model.clone(), self.model.clone(), env("WWA_MODEL")])
            .or_else(|| provider.map(|p| p.default_model.to_string()))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let explicit_base = pick(&[
            overrides.api_base.clone(),
            self.api_base.clone(),
            env("WWA_API_BASE"),
        ]);
        let has_explicit_base = explicit_base.is_some();
        let api_base = explicit_base
            .or_else(|| provider.map(|p| p.api_base.to_string()))
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let api_key = pick(&[
            overrides.api_key.clone(),
            self.api_key.clone(),
            env("WWA_API_KEY"),
            env(provider.map_or("OPENAI_API_KEY", |p| p.env_key)),
        ]);

        // Self-hosted endpoints may not need a key; hosted providers always do
        if api_key.is_none() && !has_explicit_base {
            let who = provider.map_or("openai", |p| p.name);
            return Err(CompletionError::MissingCredentials(who.to_string()));
        }

        Ok(ResolvedTarget {
            provider: provider.map(|p| p.name.to_string()),
            model: strip_routing_prefix(&model).to_string(),
            api_base,
            api_key,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// `CompletionClient` over any OpenAI-compatible endpoint.
pub struct HttpCompletionClient {
    http: Client,
    settings: LlmSettings,
    env: EnvLookup,
}

impl HttpCompletionClient {
    pub fn new(settings: LlmSettings) -> Self {
        Self {
            http: Client::new(),
            settings,
            env: Arc::new(process_env),
        }
    }

    /// Replace the environment lookup (tests).
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(lookup);
        self
    }

    pub fn resolve(&self, overrides: &LlmOverrides) -> Result<ResolvedTarget, CompletionError> {
        self.settings.resolve(overrides, self.env.as_ref())
    }
}

fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY_CHARS {
        return trimmed.to_string();
    }
    let mut cut: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
    cut.push('…');
    cut
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let target = self.resolve(&request.overrides)?;
        let body = ChatRequest {
            model: &target.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
        };

        let endpoint = target.endpoint();
        info!(
            endpoint = %endpoint,
            model = %target.model,
            provider = ?target.provider,
            prompt_chars = request.user.chars().count(),
            "Sending completion request"
        );

        let started = Instant::now();
        let mut builder = self
            .http
            .post(&endpoint)
            .timeout(request.timeout)
            .json(&body);
        if let Some(key) = &target.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                CompletionError::Timeout(request.timeout.as_secs().max(1))
            } else {
                CompletionError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                CompletionError::Timeout(request.timeout.as_secs().max(1))
            } else {
                CompletionError::Transport(e.to_string())
            }
        })?;

        if !status.is_success() {
            warn!(status = status.as_u16(), model = %target.model, "Completion request rejected");
            return Err(CompletionError::Http {
                status: status.as_u16(),
                body: truncate_body(&text),
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|e| CompletionError::Malformed(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(CompletionError::Empty)?;

        debug!(
            model = %target.model,
            duration_ms = started.elapsed().as_millis() as u64,
            reply_chars = content.chars().count(),
            "Completion received"
        );
        Ok(content)
    }

    fn describe(&self, overrides: &LlmOverrides) -> String {
        match self.resolve(overrides) {
            Ok(target) => match target.provider {
                Some(provider) => format!("{}:{}", provider, target.model),
                None => target.model,
            },
            Err(_) => "unconfigured".to_string(),
        }
    }
}
