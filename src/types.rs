use serde::{Deserialize, Serialize};

/// Descriptive attributes embedded in the metadata segment of an identifier.
///
/// Field order is the serialized order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub agent_type: String,
    /// ISO-8601 creation time with millisecond precision, e.g. `2025-01-01T00:00:00.000Z`.
    pub created: String,
    pub version: String,
}

/// The logical fields of an identifier. Built fresh by every decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedIdentifier {
    pub did: String,
    /// Always `did:self`.
    pub method: String,
    pub algorithm: String,
    /// Base64url public key token, as found in the identifier.
    pub public_key: String,
    pub endpoint: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// Base64url signature token, as found in the identifier. Never verified.
    pub signature: String,
}

/// Display-oriented summary of an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub agent_type: String,
    pub endpoint: String,
    pub created: Option<String>,
    pub version: String,
}

impl From<&DecodedIdentifier> for AgentInfo {
    fn from(decoded: &DecodedIdentifier) -> Self {
        let field = |key: &str| {
            decoded
                .metadata
                .get(key)
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Self {
            name: field("name").unwrap_or_else(|| "Unknown Agent".to_string()),
            agent_type: field("type").unwrap_or_else(|| "Unknown Type".to_string()),
            endpoint: decoded.endpoint.clone(),
            created: field("created"),
            version: field("version").unwrap_or_else(|| "1.0.0".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// Body POSTed to an agent endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct MessageRequest<'a> {
    pub message: &'a str,
    pub sender_did: &'a str,
    pub chat_history: &'a [ChatMessage],
}

/// Whatever JSON the remote agent answered with, passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentReply(pub serde_json::Value);

impl AgentReply {
    /// The conventional `response` text field, if the agent sent one.
    pub fn response(&self) -> Option<&str> {
        self.0.get("response").and_then(|v| v.as_str())
    }

    pub fn into_inner(self) -> serde_json::Value {
        self.0
    }
}
