use thiserror::Error;

/// Failures of the identifier codec. Decoding never retries and never logs.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("malformed identifier: {0}")]
    MalformedIdentifier(String),

    #[error("encoding error in {segment} segment: {reason}")]
    EncodingError {
        segment: &'static str,
        reason: String,
    },

    #[error("metadata is not a JSON object: {0}")]
    MetadataParseError(#[from] serde_json::Error),
}

/// Why an identifier could not be turned into a delivery target.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    Decode(#[from] CodecError),

    #[error("identifier does not embed an endpoint")]
    EmptyEndpoint,
}

/// A failed network exchange with a remote endpoint.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("response aborted: {0}")]
    ResponseAborted(String),

    #[error("HTTP error: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("response body is not JSON: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("request failed: {0}")]
    Request(String),
}

impl TransportError {
    /// Timeouts, aborted responses and any HTTP 5xx may succeed on a later
    /// attempt. Everything else is reported straight away.
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Timeout | TransportError::ResponseAborted(_) => true,
            TransportError::Status { status, .. } => (500..=599).contains(status),
            TransportError::Connect(_)
            | TransportError::InvalidBody(_)
            | TransportError::Request(_) => false,
        }
    }

    /// HTTP status of the failed exchange, when the remote side answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_body() || err.is_decode() {
            TransportError::ResponseAborted(err.to_string())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("unresolvable identifier: {0}")]
    UnresolvableIdentifier(#[from] ResolveError),

    #[error("delivery failed after {attempts} attempt(s): {source}")]
    DeliveryFailed {
        attempts: u32,
        #[source]
        source: TransportError,
    },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl From<CodecError> for ConnectError {
    fn from(err: CodecError) -> Self {
        ConnectError::UnresolvableIdentifier(ResolveError::Decode(err))
    }
}

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("assistant returned no choices")]
    EmptyReply,

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

#[derive(Error, Debug)]
pub enum KeyStoreError {
    #[error("key store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

pub type Result<T, E = ConnectError> = std::result::Result<T, E>;
