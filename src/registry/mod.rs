//! Identity registry: DID profiles and the shared project collection
//!
//! All operations run as one DID, fixed when the client is constructed.

pub mod ceramic;
pub mod did;
pub mod model;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{LinkedAccount, ProjectCollection};

pub use ceramic::{CeramicConfig, CeramicRegistry};
pub use did::DidKey;
pub use model::DataModel;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// Transport failure talking to the node
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stream content does not match the expected shape
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-success status other than 404
    #[error("Registry server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Node returned 404 for a stream
    #[error("Stream not found: {0}")]
    NotFound(String),

    /// Response body could not be interpreted
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Alias missing from the data model
    #[error("Alias not defined in data model: {0}")]
    UnknownAlias(String),

    /// Seed is not 32 hex-encoded bytes
    #[error("Invalid DID key: {0}")]
    InvalidKey(String),

    /// Project stream lists no controller DID
    #[error("Stream {0} has no controller")]
    NoController(String),

    /// Data model file could not be read
    #[error("Failed to read data model {path}: {source}")]
    Model {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Registry backend seam used by the publish orchestrator.
#[async_trait]
pub trait IdentityRegistry: Send + Sync {
    /// Accounts listed in a DID's `alsoKnownAs` record. A DID without a
    /// profile yields an empty list.
    async fn resolve_linked_accounts(&self, did: &str) -> Result<Vec<LinkedAccount>, RegistryError>;

    /// The authenticated DID's collection under `key`; empty if never written.
    async fn get_collection(&self, key: &str) -> Result<ProjectCollection, RegistryError>;

    /// Replace the authenticated DID's collection under `key` and return the
    /// committed value.
    async fn set_collection(
        &self,
        key: &str,
        collection: &ProjectCollection,
    ) -> Result<ProjectCollection, RegistryError>;

    /// Controlling DID of a project stream.
    async fn load_project_owner(&self, project_id: &str) -> Result<String, RegistryError>;
}
