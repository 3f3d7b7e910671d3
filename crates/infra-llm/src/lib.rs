// wwa Infrastructure - LLM Adapter
// Implements: CompletionClient (OpenAI-compatible chat completions)

pub mod client;
pub mod providers;

pub use client::{HttpCompletionClient, LlmSettings, ResolvedTarget};
pub use providers::{get_provider, provider_names, ProviderInfo, PROVIDERS};
