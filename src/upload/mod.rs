//! Content upload to content-addressed storage
//!
//! The uploader turns a local [`FileSet`] into a [`ContentIdentifier`]:
//! 1. Stream every file to the storage backend
//! 2. Report progress as chunks leave the process
//! 3. Return the root CID the backend assigned
//!
//! Status and retrieval by CID are available afterwards for verification.
//!
//! No retry happens here; a failed upload aborts the whole publish run.

pub mod files;
pub mod progress;
pub mod web3;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ContentIdentifier;

pub use files::{FileEntry, FileSet};
pub use progress::{ProgressSink, ProgressTracker, UploadProgress};
pub use web3::{Web3Storage, Web3StorageConfig};

/// Upload failures. All of them are fatal for a publish run.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Nothing to upload
    #[error("No files to upload under {0}")]
    EmptyFileSet(String),

    /// Local file could not be read
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Transport failure talking to the backend
    #[error("Storage backend unreachable: {0}")]
    Network(#[from] reqwest::Error),

    /// API token cannot be sent as a header value
    #[error("API token is not a valid header value")]
    InvalidToken,

    /// Backend rejected the token
    #[error("Storage backend rejected credentials (HTTP {status})")]
    Unauthorized { status: u16 },

    /// Account quota, rate limit or request size exceeded
    #[error("Storage quota or size limit exceeded (HTTP {status}): {message}")]
    Quota { status: u16, message: String },

    /// Any other non-success status
    #[error("Storage server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Response did not carry a well-formed CID
    #[error("Invalid content identifier in response: {0}")]
    InvalidCid(String),
}

/// Pin state reported by the storage backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinInfo {
    #[serde(default)]
    pub peer_id: Option<String>,
    #[serde(default)]
    pub peer_name: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    pub status: String,
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
}

/// Storage deal recorded for the content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealInfo {
    #[serde(default)]
    pub deal_id: Option<u64>,
    #[serde(default)]
    pub storage_provider: Option<String>,
    pub status: String,
}

/// Status lookup result for a stored CID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadStatus {
    pub cid: String,
    #[serde(default)]
    pub dag_size: u64,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pins: Vec<PinInfo>,
    #[serde(default)]
    pub deals: Vec<DealInfo>,
}

/// A file found under a stored root CID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedFile {
    pub name: String,
    pub cid: ContentIdentifier,
    /// Cumulative size of the file's DAG in bytes
    pub size: u64,
}

/// Storage backend seam used by the publish orchestrator.
#[async_trait]
pub trait ContentUploader: Send + Sync {
    /// Upload every file in the set and return the root content identifier.
    async fn upload(&self, files: &FileSet) -> Result<ContentIdentifier, TransferError>;

    /// Look up pin/deal status for a previously uploaded CID.
    async fn status(&self, cid: &ContentIdentifier) -> Result<UploadStatus, TransferError>;

    /// List the files reachable from a stored root CID.
    async fn get(&self, cid: &ContentIdentifier) -> Result<Vec<RetrievedFile>, TransferError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parses_backend_shape() {
        let raw = serde_json::json!({
            "cid": "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi",
            "dagSize": 2048,
            "created": "2022-03-01T10:00:00Z",
            "pins": [{"peerId": "12D3Koo", "peerName": "web3-storage-sv15", "region": "US-CA", "status": "Pinned"}],
            "deals": []
        });

        let status: UploadStatus = serde_json::from_value(raw).unwrap();
        assert_eq!(status.dag_size, 2048);
        assert_eq!(status.pins.len(), 1);
        assert_eq!(status.pins[0].status, "Pinned");
        assert!(status.created.is_some());
    }
}
