//! Key material for new identifiers and a file-backed store for it.

use std::path::{Path, PathBuf};

use ed25519_dalek::{Signer as _, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::did::{self, base64url_decode, base64url_encode, Signer};
use crate::error::KeyStoreError;
use crate::types::AgentMetadata;

pub const ED25519_ALGORITHM: &str = "Ed25519";

/// Signs identifiers with an ed25519 key.
#[derive(Clone)]
pub struct Ed25519Signer {
    signing_key: SigningKey,
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Signer")
            .field("public_key", &base64url_encode(self.public_key().as_bytes()))
            .finish_non_exhaustive()
    }
}

impl Ed25519Signer {
    pub fn generate() -> Self {
        Self::from_seed(&rand::random())
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    pub fn public_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl Signer for Ed25519Signer {
    fn algorithm(&self) -> &str {
        ED25519_ALGORITHM
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }
}

/// A freshly minted agent identity.
#[derive(Debug, Clone)]
pub struct Identity {
    pub did: String,
    /// Base64url public key, identical to the key segment of `did`.
    pub public_key: String,
    pub metadata: AgentMetadata,
    pub signer: Ed25519Signer,
}

impl Identity {
    /// Generates a key pair and signs a new identifier for `name` at `endpoint`.
    pub fn generate(name: &str, endpoint: &str) -> Result<Self, KeyStoreError> {
        Self::from_signer(Ed25519Signer::generate(), AgentMetadata::new(name), endpoint)
    }

    pub fn from_signer(
        signer: Ed25519Signer,
        metadata: AgentMetadata,
        endpoint: &str,
    ) -> Result<Self, KeyStoreError> {
        let public_key = signer.public_key();
        let did = did::encode_with_metadata(&metadata, endpoint, public_key.as_bytes(), &signer)?;

        Ok(Self {
            did,
            public_key: base64url_encode(public_key.as_bytes()),
            metadata,
            signer,
        })
    }
}

/// On-disk form of an [`Identity`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRecord {
    pub did: String,
    pub public_key: String,
    /// Base64url ed25519 seed.
    pub private_key: String,
    pub metadata: AgentMetadata,
}

impl From<&Identity> for KeyRecord {
    fn from(identity: &Identity) -> Self {
        Self {
            did: identity.did.clone(),
            public_key: identity.public_key.clone(),
            private_key: base64url_encode(identity.signer.seed()),
            metadata: identity.metadata.clone(),
        }
    }
}

impl TryFrom<KeyRecord> for Identity {
    type Error = KeyStoreError;

    fn try_from(record: KeyRecord) -> Result<Self, Self::Error> {
        let seed: [u8; 32] = base64url_decode(&record.private_key)?
            .try_into()
            .map_err(|_| KeyStoreError::InvalidKey("seed must be 32 bytes".into()))?;
        let signer = Ed25519Signer::from_seed(&seed);

        if base64url_encode(signer.public_key().as_bytes()) != record.public_key {
            return Err(KeyStoreError::InvalidKey(
                "private key does not match public key".into(),
            ));
        }

        Ok(Self {
            did: record.did,
            public_key: record.public_key,
            metadata: record.metadata,
            signer,
        })
    }
}

/// Directory of `<unix-millis>_<name>.json` key files.
#[derive(Debug, Clone)]
pub struct KeyStore {
    dir: PathBuf,
}

impl KeyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `identity` to a new file, creating the directory if needed.
    pub fn save(&self, identity: &Identity) -> Result<PathBuf, KeyStoreError> {
        std::fs::create_dir_all(&self.dir)?;

        let file_name = format!(
            "{}_{}.json",
            chrono::Utc::now().timestamp_millis(),
            sanitize(&identity.metadata.name)
        );
        let path = self.dir.join(file_name);
        let json = serde_json::to_string_pretty(&KeyRecord::from(identity))?;
        std::fs::write(&path, json)?;

        debug!(path = %path.display(), "saved identity");
        Ok(path)
    }

    pub fn load(&self, path: impl AsRef<Path>) -> Result<Identity, KeyStoreError> {
        let path = path.as_ref();
        let path = if path.is_relative() && !path.exists() {
            self.dir.join(path)
        } else {
            path.to_path_buf()
        };
        let record: KeyRecord = serde_json::from_slice(&std::fs::read(path)?)?;
        Identity::try_from(record)
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
