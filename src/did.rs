//! The `did:self` identifier codec.
//!
//! An identifier carries everything needed to reach and describe an agent:
//!
//! ```text
//! did:self:<algorithm>:<publicKey>:<endpoint>:<metadataJSON>:<signature>
//! ```
//!
//! Every segment after the algorithm is base64url without padding, so no
//! segment can contain a `:`. The signature covers the first five segments
//! joined by `:` and is carried along but never verified here.
//!
//! Two contracts are offered side by side. [`decode`] reports why an
//! identifier is unusable. [`try_decode`], [`is_valid`], [`endpoint_of`],
//! [`metadata_of`] and [`agent_info_of`] fold every failure into `None` or
//! `false` for callers that only care whether it worked.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::error::CodecError;
use crate::types::{AgentInfo, AgentMetadata, DecodedIdentifier};

pub const SCHEME: &str = "did";
pub const METHOD_NAME: &str = "self";
pub const METHOD: &str = "did:self";
pub const DEFAULT_ALGORITHM: &str = "ECDSA";
pub const DEFAULT_AGENT_TYPE: &str = "UserAgent";
pub const METADATA_VERSION: &str = "1.0.0";

const SEGMENT_COUNT: usize = 7;

// `-`/`_` alphabet, no padding on encode, padding optional on decode.
const BASE64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Produces the signature segment of a new identifier.
///
/// Any `Fn(&[u8]) -> Vec<u8>` is a signer tagged with [`DEFAULT_ALGORITHM`].
pub trait Signer {
    /// Algorithm token written into the identifier. Must not contain `:`.
    fn algorithm(&self) -> &str {
        DEFAULT_ALGORITHM
    }

    fn sign(&self, message: &[u8]) -> Vec<u8>;
}

impl<F> Signer for F
where
    F: Fn(&[u8]) -> Vec<u8>,
{
    fn sign(&self, message: &[u8]) -> Vec<u8> {
        self(message)
    }
}

impl AgentMetadata {
    /// Metadata for a new agent, stamped with the current time.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            agent_type: DEFAULT_AGENT_TYPE.to_string(),
            created: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            version: METADATA_VERSION.to_string(),
        }
    }

    pub fn with_type(mut self, agent_type: impl Into<String>) -> Self {
        self.agent_type = agent_type.into();
        self
    }
}

pub fn base64url_encode(input: impl AsRef<[u8]>) -> String {
    BASE64URL.encode(input)
}

pub fn base64url_decode(token: &str) -> Result<Vec<u8>, CodecError> {
    decode_bytes("value", token)
}

/// Decodes a base64url token that must hold UTF-8 text.
pub fn base64url_decode_str(token: &str) -> Result<String, CodecError> {
    decode_text("value", token)
}

fn decode_bytes(segment: &'static str, token: &str) -> Result<Vec<u8>, CodecError> {
    BASE64URL
        .decode(token)
        .map_err(|e| CodecError::EncodingError {
            segment,
            reason: e.to_string(),
        })
}

fn decode_text(segment: &'static str, token: &str) -> Result<String, CodecError> {
    String::from_utf8(decode_bytes(segment, token)?).map_err(|e| CodecError::EncodingError {
        segment,
        reason: e.to_string(),
    })
}

/// Builds a signed identifier for a new agent named `name`.
pub fn encode(
    name: &str,
    endpoint: &str,
    public_key: &[u8],
    signer: &impl Signer,
) -> Result<String, CodecError> {
    encode_with_metadata(&AgentMetadata::new(name), endpoint, public_key, signer)
}

/// Builds a signed identifier from caller-supplied metadata.
pub fn encode_with_metadata(
    metadata: &AgentMetadata,
    endpoint: &str,
    public_key: &[u8],
    signer: &impl Signer,
) -> Result<String, CodecError> {
    let algorithm = signer.algorithm();
    if algorithm.contains(':') {
        return Err(CodecError::MalformedIdentifier(format!(
            "algorithm `{algorithm}` contains `:`"
        )));
    }

    let metadata_json = serde_json::to_string(metadata)?;
    let unsigned = format!(
        "{METHOD}:{algorithm}:{}:{}:{}",
        base64url_encode(public_key),
        base64url_encode(endpoint),
        base64url_encode(metadata_json),
    );
    let signature = signer.sign(unsigned.as_bytes());

    Ok(format!("{unsigned}:{}", base64url_encode(signature)))
}

/// Parses an identifier, reporting the first problem found.
///
/// Exactly seven segments are accepted: trailing segments beyond the
/// signature make the identifier malformed rather than being ignored.
pub fn decode(did: &str) -> Result<DecodedIdentifier, CodecError> {
    let parts: Vec<&str> = did.split(':').collect();

    if parts.len() != SEGMENT_COUNT {
        return Err(CodecError::MalformedIdentifier(format!(
            "expected {SEGMENT_COUNT} segments, found {}",
            parts.len()
        )));
    }
    if parts[0] != SCHEME || parts[1] != METHOD_NAME {
        return Err(CodecError::MalformedIdentifier(format!(
            "unsupported method `{}:{}`",
            parts[0], parts[1]
        )));
    }

    let endpoint = decode_text("endpoint", parts[4])?;
    let metadata = match serde_json::from_str::<Value>(&decode_text("metadata", parts[5])?)? {
        Value::Object(map) => map,
        other => {
            return Err(CodecError::MetadataParseError(serde::de::Error::custom(
                format!("expected an object, found `{other}`"),
            )))
        }
    };

    Ok(DecodedIdentifier {
        did: did.to_string(),
        method: METHOD.to_string(),
        algorithm: parts[2].to_string(),
        public_key: parts[3].to_string(),
        endpoint,
        metadata,
        signature: parts[6].to_string(),
    })
}

pub fn try_decode(did: &str) -> Option<DecodedIdentifier> {
    decode(did).ok()
}

pub fn is_valid(did: &str) -> bool {
    decode(did).is_ok()
}

pub fn endpoint_of(did: &str) -> Option<String> {
    try_decode(did).map(|d| d.endpoint)
}

pub fn metadata_of(did: &str) -> Option<Map<String, Value>> {
    try_decode(did).map(|d| d.metadata)
}

pub fn agent_info_of(did: &str) -> Option<AgentInfo> {
    try_decode(did).map(|d| AgentInfo::from(&d))
}
