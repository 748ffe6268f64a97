use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;
pub const MAX_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 2_000;
pub const DEFAULT_USER_AGENT: &str = "DID-Connect/1.0.0";

/// Delivery policy for [`crate::AgentClient`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Per-attempt timeout.
    pub timeout_ms: u64,
    /// Extra attempts allowed after the first one fails transiently.
    pub max_retries: u32,
    /// Fixed backoff between attempts.
    pub retry_delay_ms: u64,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_retries: MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

pub const DEFAULT_ASSISTANT_API: &str = "https://api.siliconflow.cn/v1/chat/completions";
pub const DEFAULT_ASSISTANT_MODEL: &str = "deepseek-ai/DeepSeek-R1-Distill-Qwen-14B";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a professional English learning assistant, \
skilled at teaching grammar, speaking practice and writing. Explain things simply and give \
example sentences when useful. If the user writes in Chinese, answer in Chinese with English \
explanations and examples; if the user writes in English, answer in English.";

/// Settings for the chat-completion assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub api_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    pub system_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub timeout_ms: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_ASSISTANT_API.to_string(),
            api_key: None,
            model: DEFAULT_ASSISTANT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: 0.7,
            max_tokens: 800,
            top_p: 0.95,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl AssistantConfig {
    /// Defaults, overridden by `ENGLISH_ASSISTANT_API` and `API_KEY` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("ENGLISH_ASSISTANT_API") {
            if !url.is_empty() {
                config.api_url = url;
            }
        }
        config.api_key = std::env::var("API_KEY").ok().filter(|k| !k.is_empty());
        config
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
