//! Self-describing `did:self` identifiers and a client for messaging the
//! agents they address.
//!
//! An identifier embeds the agent's public key, endpoint and metadata, so
//! reaching an agent needs no registry:
//!
//! 1. [`did`] encodes, decodes and inspects identifiers. It is pure and never
//!    touches the network.
//! 2. [`AgentClient`] resolves an identifier to its endpoint and delivers a
//!    message, retrying transient failures with a fixed backoff.
//!
//! Embedded signatures are carried but not verified: anyone holding an
//! identifier can use it, and nothing here proves who minted it.

mod assistant;
mod client;
mod config;
pub mod did;
mod error;
pub mod keys;
mod transport;
mod types;

pub use assistant::AssistantClient;
pub use client::AgentClient;
pub use config::*;
pub use did::{decode, endpoint_of, is_valid, metadata_of, try_decode, Signer};
pub use error::*;
pub use transport::{HttpTransport, Transport};
pub use types::*;
