//! Error types for a publish run

use thiserror::Error;

use crate::context::ContextError;
use crate::registry::RegistryError;
use crate::types::ContentIdentifier;
use crate::upload::TransferError;

/// Fatal publish failures. Benign early exits are reported as
/// [`crate::publish::NoOpReason`] instead.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Upload failed: {0}")]
    Transfer(#[from] TransferError),

    #[error("Could not resolve run context: {0}")]
    Context(#[from] ContextError),

    #[error("Could not resolve owner of project {project_id}: {source}")]
    OwnerLookup {
        project_id: String,
        #[source]
        source: RegistryError,
    },

    #[error("Could not resolve linked accounts of {did}: {source}")]
    ProfileLookup {
        did: String,
        #[source]
        source: RegistryError,
    },

    #[error("Could not read registry collection {key}: {source}")]
    RegistryRead {
        key: String,
        #[source]
        source: RegistryError,
    },

    /// The content is stored and addressable but the registry does not
    /// reference it.
    #[error("Registry write failed, {cid} is uploaded but not registered: {source}")]
    RegistryWrite {
        cid: ContentIdentifier,
        #[source]
        source: RegistryError,
    },
}

/// Result type for publish operations
pub type Result<T> = std::result::Result<T, PublishError>;
