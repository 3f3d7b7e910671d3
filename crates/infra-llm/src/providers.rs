// Provider Registry
// Base URLs, key variables and default models for known endpoints

/// One OpenAI-compatible endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderInfo {
    pub name: &'static str,
    pub api_base: &'static str,
    /// Environment variable holding the API key
    pub env_key: &'static str,
    /// Default model in `route/model` form
    pub default_model: &'static str,
    /// Proxy that resells other vendors' models
    pub is_relay: bool,
}

/// Model used when neither a provider nor a model is configured
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Endpoint used when nothing else names one
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Routing prefixes that name a wire format rather than part of the model id
const ROUTING_PREFIXES: &[&str] = &["openai/", "gemini/", "anthropic/"];

pub const PROVIDERS: &[ProviderInfo] = &[
    ProviderInfo {
        name: "openai",
        api_base: DEFAULT_API_BASE,
        env_key: "OPENAI_API_KEY",
        default_model: "openai/gpt-4o-mini",
        is_relay: false,
    },
    ProviderInfo {
        name: "google",
        api_base: "https://generativelanguage.googleapis.com/v1beta/openai",
        env_key: "GEMINI_API_KEY",
        default_model: "gemini/gemini-2.0-flash",
        is_relay: false,
    },
    ProviderInfo {
        name: "anthropic",
        api_base: "https://api.anthropic.com/v1",
        env_key: "ANTHROPIC_API_KEY",
        default_model: "anthropic/claude-sonnet-4-5-20250929",
        is_relay: false,
    },
    ProviderInfo {
        name: "glm",
        api_base: "https://open.bigmodel.cn/api/paas/v4",
        env_key: "GLM_API_KEY",
        default_model: "openai/glm-4-flash",
        is_relay: false,
    },
    ProviderInfo {
        name: "minimax",
        api_base: "https://api.minimax.chat/v1",
        env_key: "MINIMAX_API_KEY",
        default_model: "openai/MiniMax-Text-01",
        is_relay: false,
    },
    ProviderInfo {
        name: "doubao",
        api_base: "https://ark.cn-beijing.volces.com/api/v3",
        env_key: "DOUBAO_API_KEY",
        default_model: "openai/doubao-1.5-pro-32k",
        is_relay: false,
    },
    ProviderInfo {
        name: "deepseek",
        api_base: "https://api.deepseek.com/v1",
        env_key: "DEEPSEEK_API_KEY",
        default_model: "openai/deepseek-chat",
        is_relay: false,
    },
    ProviderInfo {
        name: "packycode",
        api_base: "https://api.packycode.com/v1",
        env_key: "PACKYCODE_API_KEY",
        default_model: "openai/gpt-4o-mini",
        is_relay: true,
    },
    ProviderInfo {
        name: "yunwu",
        api_base: "https://yunwu.ai/v1",
        env_key: "YUNWU_API_KEY",
        default_model: "openai/gpt-4o-mini",
        is_relay: true,
    },
    ProviderInfo {
        name: "siliconflow",
        api_base: "https://api.siliconflow.cn/v1",
        env_key: "SILICONFLOW_API_KEY",
        default_model: "openai/deepseek-ai/DeepSeek-V3",
        is_relay: true,
    },
    ProviderInfo {
        name: "openrouter",
        api_base: "https://openrouter.ai/api/v1",
        env_key: "OPENROUTER_API_KEY",
        default_model: "openai/openai/gpt-4o-mini",
        is_relay: true,
    },
    ProviderInfo {
        name: "zhizengzeng",
        api_base: "https://api.zhizengzeng.com/v1",
        env_key: "ZZZ_API_KEY",
        default_model: "openai/deepseek-chat",
        is_relay: true,
    },
];

/// Case-insensitive lookup.
pub fn get_provider(name: &str) -> Option<&'static ProviderInfo> {
    let name = name.trim();
    PROVIDERS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

pub fn provider_names() -> Vec<&'static str> {
    PROVIDERS.iter().map(|p| p.name).collect()
}

/// Drop one leading routing prefix: `openai/openai/gpt-4o-mini` -> `openai/gpt-4o-mini`.
pub fn strip_routing_prefix(model: &str) -> &str {
    ROUTING_PREFIXES
        .iter()
        .find_map(|prefix| model.strip_prefix(prefix))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_every_provider() {
        assert_eq!(PROVIDERS.len(), 12);
        assert_eq!(get_provider("DeepSeek").map(|p| p.env_key), Some("DEEPSEEK_API_KEY"));
        assert!(get_provider("nope").is_none());
        assert!(provider_names().contains(&"zhizengzeng"));
    }

    #[test]
    fn test_strip_routing_prefix() {
        assert_eq!(strip_routing_prefix("openai/gpt-4o-mini"), "gpt-4o-mini");
        assert_eq!(strip_routing_prefix("openai/openai/gpt-4o-mini"), "openai/gpt-4o-mini");
        assert_eq!(
            strip_routing_prefix("openai/deepseek-ai/DeepSeek-V3"),
            "deepseek-ai/DeepSeek-V3"
        );
        assert_eq!(strip_routing_prefix("gemini/gemini-2.0-flash"), "gemini-2.0-flash");
        assert_eq!(strip_routing_prefix("deepseek-chat"), "deepseek-chat");
        assert_eq!(strip_routing_prefix("openai/"), "openai/");
    }
}
