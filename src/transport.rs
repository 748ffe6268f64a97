use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};

use crate::config::ClientConfig;
use crate::error::{ConnectError, Result, TransportError};

/// The single network seam of the agent client.
///
/// One call is one attempt: implementations must not retry on their own.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` (already serialized JSON) to `url` and return the parsed
    /// JSON reply of a 2xx response.
    async fn post_json(
        &self,
        url: &str,
        body: &[u8],
    ) -> std::result::Result<serde_json::Value, TransportError>;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            config
                .user_agent
                .parse()
                .map_err(|_| ConnectError::ConfigError("user agent is not a valid header".into()))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(|e| ConnectError::ConfigError(e.to_string()))?;

        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        body: &[u8],
    ) -> std::result::Result<serde_json::Value, TransportError> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_vec())
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: response
                    .text()
                    .await
                    .unwrap_or_else(|e| format!("<unreadable body: {e}>")),
            });
        }

        let bytes = response.bytes().await.map_err(TransportError::from_reqwest)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
