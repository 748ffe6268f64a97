use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::AssistantConfig;
use crate::error::{AssistantError, TransportError};
use crate::types::ChatMessage;

/// Client for an OpenAI-style chat-completion endpoint.
#[derive(Clone, Debug)]
pub struct AssistantClient {
    client: reqwest::Client,
    config: AssistantConfig,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

impl AssistantClient {
    pub fn new(config: AssistantConfig) -> Result<Self, AssistantError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(api_key) = &config.api_key {
            let mut value: HeaderValue = format!("Bearer {api_key}")
                .parse()
                .map_err(|_| AssistantError::ConfigError("API key is not a valid header".into()))?;
            value.set_sensitive(true);
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(|e| AssistantError::ConfigError(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    /// Asks the assistant to answer `message` in the context of `history`.
    pub async fn complete(
        &self,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<String, AssistantError> {
        let request = CompletionRequest {
            model: &self.config.model,
            messages: build_messages(&self.config.system_prompt, history, message),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            top_p: self.config.top_p,
        };
        debug!(model = %self.config.model, turns = history.len(), "requesting completion");

        let response = self
            .client
            .post(&self.config.api_url)
            .json(&request)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(TransportError::Status {
                status: response.status().as_u16(),
                body: response
                    .text()
                    .await
                    .unwrap_or_else(|e| format!("<unreadable body: {e}>")),
            }
            .into());
        }

        let bytes = response.bytes().await.map_err(TransportError::from_reqwest)?;
        let data: CompletionResponse =
            serde_json::from_slice(&bytes).map_err(TransportError::from)?;

        data.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(AssistantError::EmptyReply)
    }

    /// Like [`complete`](Self::complete), but turns any failure into an
    /// apology that can be shown to the user as the assistant's answer.
    pub async fn reply(&self, message: &str, history: &[ChatMessage]) -> String {
        match self.complete(message, history).await {
            Ok(text) => text,
            Err(err) => {
                error!(error = %err, "assistant request failed");
                apology(&err)
            }
        }
    }
}

/// System prompt first, then the history reduced to role and content, then
/// the new user message.
fn build_messages(system_prompt: &str, history: &[ChatMessage], message: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::new("system", system_prompt));
    messages.extend(history.iter().cloned());
    messages.push(ChatMessage::user(message));
    messages
}

fn apology(err: &AssistantError) -> String {
    format!("Sorry, something went wrong while handling your request: {err}. Please try again later.")
}
