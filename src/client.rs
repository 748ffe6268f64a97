use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::did;
use crate::error::{ConnectError, ResolveError, Result};
use crate::transport::{HttpTransport, Transport};
use crate::types::{AgentReply, ChatMessage, MessageRequest};

/// Client for talking to agents addressed by `did:self` identifiers.
///
/// Each `send` is self-contained: the client holds no per-call state, so one
/// instance can serve any number of concurrent sends.
///
/// Retried requests are byte-identical to the first one. Whether the remote
/// handler tolerates a duplicate is up to the remote side.
#[derive(Clone, Debug)]
pub struct AgentClient<T = HttpTransport> {
    transport: T,
    config: ClientConfig,
}

impl AgentClient<HttpTransport> {
    /// Creates a client that delivers over HTTP.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self { transport, config })
    }
}

impl<T: Transport> AgentClient<T> {
    pub fn with_transport(transport: T, config: ClientConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sends `message` anonymously and without history.
    pub async fn send(&self, did: &str, message: &str) -> Result<AgentReply> {
        self.send_with(did, message, "", &[]).await
    }

    /// Resolves `did` and delivers `message` to its endpoint.
    ///
    /// Timeouts, aborted responses and HTTP 5xx replies are retried up to
    /// `max_retries` times with a fixed delay. Any other failure, or the last
    /// transient one, comes back as [`ConnectError::DeliveryFailed`].
    pub async fn send_with(
        &self,
        did: &str,
        message: &str,
        sender_did: &str,
        history: &[ChatMessage],
    ) -> Result<AgentReply> {
        let decoded = did::decode(did).map_err(ResolveError::from)?;
        if decoded.endpoint.is_empty() {
            return Err(ResolveError::EmptyEndpoint.into());
        }

        let name = decoded
            .metadata
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        info!(agent = name, endpoint = %decoded.endpoint, "connecting to agent");

        let body = serde_json::to_vec(&MessageRequest {
            message,
            sender_did,
            chat_history: history,
        })
        .map_err(|e| ConnectError::ConfigError(format!("unserializable request: {e}")))?;

        let mut attempt = 0;
        loop {
            debug!(attempt = attempt + 1, endpoint = %decoded.endpoint, "sending message");

            match self.transport.post_json(&decoded.endpoint, &body).await {
                Ok(reply) => return Ok(AgentReply(reply)),
                Err(err) if err.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(
                        error = %err,
                        retry = attempt,
                        max_retries = self.config.max_retries,
                        "delivery failed, retrying"
                    );
                    sleep(self.config.retry_delay()).await;
                }
                Err(err) => {
                    error!(error = %err, attempts = attempt + 1, "delivery failed");
                    return Err(ConnectError::DeliveryFailed {
                        attempts: attempt + 1,
                        source: err,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::types::AgentMetadata;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays scripted outcomes and records every request it sees.
    #[derive(Default)]
    struct ScriptedTransport {
        outcomes: Mutex<VecDeque<std::result::Result<serde_json::Value, TransportError>>>,
        fallback_status: Option<u16>,
        seen: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl ScriptedTransport {
        fn always_status(status: u16) -> Self {
            Self {
                fallback_status: Some(status),
                ..Self::default()
            }
        }

        fn scripted(
            outcomes: impl IntoIterator<Item = std::result::Result<serde_json::Value, TransportError>>,
        ) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into_iter().collect()),
                ..Self::default()
            }
        }

        fn attempts(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn post_json(
            &self,
            url: &str,
            body: &[u8],
        ) -> std::result::Result<serde_json::Value, TransportError> {
            self.seen.lock().unwrap().push((url.to_string(), body.to_vec()));
            if let Some(outcome) = self.outcomes.lock().unwrap().pop_front() {
                return outcome;
            }
            Err(TransportError::Status {
                status: self.fallback_status.unwrap_or(500),
                body: "scripted".into(),
            })
        }
    }

    fn agent_did(endpoint: &str) -> String {
        let metadata = AgentMetadata {
            name: "Echo".into(),
            agent_type: "Test".into(),
            created: "2025-01-01T00:00:00.000Z".into(),
            version: "1.0.0".into(),
        };
        did::encode_with_metadata(&metadata, endpoint, b"pk", &|_: &[u8]| b"sig".to_vec())
            .unwrap()
    }

    fn client(transport: ScriptedTransport) -> AgentClient<ScriptedTransport> {
        AgentClient::with_transport(transport, ClientConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn returns_reply_unmodified() {
        let reply = serde_json::json!({"response": "hi", "extra": [1, 2]});
        let client = client(ScriptedTransport::scripted([Ok(reply.clone())]));

        let got = client.send(&agent_did("https://x/api/msg"), "hello").await.unwrap();

        assert_eq!(got.response(), Some("hi"));
        assert_eq!(got.into_inner(), reply);
        assert_eq!(client.transport.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn posts_message_history_and_sender_to_endpoint() {
        let client = client(ScriptedTransport::scripted([Ok(serde_json::json!({}))]));
        let history = vec![ChatMessage::user("q"), ChatMessage::assistant("a")];

        client
            .send_with(&agent_did("https://x/api/msg"), "next", "did:self:me", &history)
            .await
            .unwrap();

        let seen = client.transport.seen.lock().unwrap();
        let (url, body) = &seen[0];
        assert_eq!(url, "https://x/api/msg");
        let body: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "message": "next",
                "sender_did": "did:self:me",
                "chat_history": [
                    {"role": "user", "content": "q"},
                    {"role": "assistant", "content": "a"}
                ]
            })
        );
        assert_eq!(history.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn anonymous_send_uses_empty_sender_and_history() {
        let client = client(ScriptedTransport::scripted([Ok(serde_json::json!({}))]));
        client.send(&agent_did("https://x"), "m").await.unwrap();

        let seen = client.transport.seen.lock().unwrap();
        let body: serde_json::Value = serde_json::from_slice(&seen[0].1).unwrap();
        assert_eq!(body["sender_did"], "");
        assert_eq!(body["chat_history"], serde_json::json!([]));
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_503_exhausts_retries() {
        let client = client(ScriptedTransport::always_status(503));
        let started = tokio::time::Instant::now();

        let err = client.send(&agent_did("https://x"), "m").await.unwrap_err();

        assert_eq!(client.transport.attempts(), MAX_ATTEMPTS);
        assert!(started.elapsed() >= Duration::from_millis(2 * 2_000));
        match err {
            ConnectError::DeliveryFailed { attempts, source } => {
                assert_eq!(attempts as usize, MAX_ATTEMPTS);
                assert_eq!(source.status(), Some(503));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    const MAX_ATTEMPTS: usize = crate::config::MAX_RETRIES as usize + 1;

    #[tokio::test(start_paused = true)]
    async fn persistent_500_exhausts_retries() {
        let client = client(ScriptedTransport::always_status(500));

        let err = client.send(&agent_did("https://x"), "m").await.unwrap_err();

        assert_eq!(client.transport.attempts(), MAX_ATTEMPTS);
        assert!(matches!(
            err,
            ConnectError::DeliveryFailed { source: TransportError::Status { status: 500, .. }, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn bad_request_fails_on_first_attempt() {
        let client = client(ScriptedTransport::always_status(400));

        let err = client.send(&agent_did("https://x"), "m").await.unwrap_err();

        assert_eq!(client.transport.attempts(), 1);
        assert!(matches!(
            err,
            ConnectError::DeliveryFailed { attempts: 1, source: TransportError::Status { status: 400, .. } }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn connect_errors_are_not_retried() {
        let client = client(ScriptedTransport::scripted([Err(TransportError::Connect(
            "dns error".into(),
        ))]));

        let err = client.send(&agent_did("https://x"), "m").await.unwrap_err();

        assert_eq!(client.transport.attempts(), 1);
        assert!(matches!(
            err,
            ConnectError::DeliveryFailed { source: TransportError::Connect(_), .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let client = client(ScriptedTransport::scripted([
            Err(TransportError::Timeout),
            Err(TransportError::ResponseAborted("reset".into())),
            Ok(serde_json::json!({"response": "late"})),
        ]));

        let reply = client.send(&agent_did("https://x"), "m").await.unwrap();

        assert_eq!(reply.response(), Some("late"));
        let seen = client.transport.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|request| request == &seen[0]));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_count_is_configurable() {
        let config = ClientConfig {
            max_retries: 0,
            ..ClientConfig::default()
        };
        let client = AgentClient::with_transport(ScriptedTransport::always_status(504), config);

        let err = client.send(&agent_did("https://x"), "m").await.unwrap_err();

        assert_eq!(client.transport.attempts(), 1);
        assert!(matches!(err, ConnectError::DeliveryFailed { attempts: 1, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_identifier_is_unresolvable() {
        let client = client(ScriptedTransport::default());

        let err = client.send("did:web:example.com", "m").await.unwrap_err();

        assert_eq!(client.transport.attempts(), 0);
        assert!(matches!(
            err,
            ConnectError::UnresolvableIdentifier(ResolveError::Decode(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_endpoint_is_unresolvable() {
        let client = client(ScriptedTransport::default());

        let err = client.send(&agent_did(""), "m").await.unwrap_err();

        assert_eq!(client.transport.attempts(), 0);
        assert!(matches!(
            err,
            ConnectError::UnresolvableIdentifier(ResolveError::EmptyEndpoint)
        ));
    }
}
