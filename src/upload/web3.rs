//! Web3.Storage HTTP client
//!
//! Uploads and status go to the authenticated API. Retrieval reads the
//! stored DAG back through the public gateway as dag-json, so the API token
//! never leaves for the gateway host.

use bytes::Bytes;
use futures::Stream;
use reqwest::{header, multipart, Body, Client, StatusCode};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use super::progress::{log_progress, ProgressSink, SharedProgress};
use super::{ContentUploader, FileSet, RetrievedFile, TransferError, UploadStatus};
use crate::types::ContentIdentifier;

/// Read size for streamed file bodies
const CHUNK_SIZE: usize = 256 * 1024;

pub const DEFAULT_API_URL: &str = "https://api.web3.storage";
pub const DEFAULT_GATEWAY_URL: &str = "https://w3s.link";

const DAG_JSON: &str = "application/vnd.ipld.dag-json";

#[derive(Debug, Clone)]
pub struct Web3StorageConfig {
    pub api_url: String,
    pub token: String,
    /// IPFS gateway used for retrieval
    pub gateway_url: String,
    /// Name attached to the upload in the storage dashboard
    pub upload_name: Option<String>,
    pub timeout_secs: u64,
}

impl Default for Web3StorageConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: String::new(),
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            upload_name: None,
            timeout_secs: 300,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    cid: String,
}

/// UnixFS directory node as rendered by a gateway in dag-json.
#[derive(Debug, Deserialize)]
struct DagNode {
    #[serde(rename = "Links", default)]
    links: Vec<DagLink>,
}

#[derive(Debug, Deserialize)]
struct DagLink {
    #[serde(rename = "Hash")]
    hash: CidLink,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Tsize", default)]
    tsize: u64,
}

#[derive(Debug, Deserialize)]
struct CidLink {
    #[serde(rename = "/")]
    cid: String,
}

/// Uploader backed by the Web3.Storage `/upload` and `/status` endpoints.
pub struct Web3Storage {
    config: Web3StorageConfig,
    client: Client,
    gateway: Client,
    progress: ProgressSink,
}

impl Web3Storage {
    pub fn new(config: Web3StorageConfig) -> Result<Self, TransferError> {
        let mut headers = header::HeaderMap::new();
        let auth = header::HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|_| TransferError::InvalidToken)?;
        headers.insert(header::AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let gateway = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config,
            client,
            gateway,
            progress: log_progress(),
        })
    }

    /// Replace the default logging progress sink.
    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = sink;
        self
    }

    fn base_url(&self) -> &str {
        self.config.api_url.trim_end_matches('/')
    }

    async fn error_for_status(response: reqwest::Response) -> TransferError {
        let status = response.status();
        let message = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TransferError::Unauthorized {
                status: status.as_u16(),
            },
            StatusCode::PAYLOAD_TOO_LARGE
            | StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INSUFFICIENT_STORAGE => TransferError::Quota {
                status: status.as_u16(),
                message,
            },
            _ => TransferError::Server {
                status: status.as_u16(),
                message,
            },
        }
    }
}

#[async_trait::async_trait]
impl ContentUploader for Web3Storage {
    async fn upload(&self, files: &FileSet) -> Result<ContentIdentifier, TransferError> {
        let total = files.total_size();
        let progress = SharedProgress::new(total, self.progress.clone());

        let mut form = multipart::Form::new();
        for entry in files.entries() {
            let body = Body::wrap_stream(file_stream(entry.path.clone(), progress.clone()));
            let part = multipart::Part::stream_with_length(body, entry.size)
                .file_name(entry.name.clone())
                .mime_str("application/octet-stream")?;
            form = form.part("file", part);
        }

        info!(
            files = files.len(),
            total_bytes = total,
            "Uploading file set to {}",
            self.base_url()
        );

        let url = format!("{}/upload", self.base_url());
        let mut request = self.client.post(&url).multipart(form);
        if let Some(ref name) = self.config.upload_name {
            request = request.header("X-Name", urlencoding::encode(name).into_owned());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Self::error_for_status(response).await);
        }

        // A set of empty files never yields a chunk to count.
        progress.finish();

        let body: UploadResponse = response.json().await?;
        let cid = ContentIdentifier::parse(&body.cid)
            .map_err(|e| TransferError::InvalidCid(format!("{}: {}", body.cid, e)))?;

        info!(cid = %cid, "Uploaded files with cid");
        Ok(cid)
    }

    async fn status(&self, cid: &ContentIdentifier) -> Result<UploadStatus, TransferError> {
        let url = format!(
            "{}/status/{}",
            self.base_url(),
            urlencoding::encode(cid.as_str())
        );
        debug!(cid = %cid, "Fetching upload status");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_for_status(response).await);
        }
        Ok(response.json().await?)
    }

    /// Top-level entries of the stored root directory.
    async fn get(&self, cid: &ContentIdentifier) -> Result<Vec<RetrievedFile>, TransferError> {
        let url = format!(
            "{}/ipfs/{}",
            self.config.gateway_url.trim_end_matches('/'),
            urlencoding::encode(cid.as_str())
        );
        debug!(cid = %cid, "Retrieving stored files");

        let response = self
            .gateway
            .get(&url)
            .query(&[("format", "dag-json")])
            .header(header::ACCEPT, DAG_JSON)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_for_status(response).await);
        }

        let node: DagNode = response.json().await?;
        node.links
            .into_iter()
            .map(|link| -> Result<RetrievedFile, TransferError> {
                let cid = ContentIdentifier::parse(&link.hash.cid)
                    .map_err(|e| TransferError::InvalidCid(format!("{}: {}", link.hash.cid, e)))?;
                Ok(RetrievedFile {
                    name: link.name,
                    cid,
                    size: link.tsize,
                })
            })
            .collect()
    }
}

/// Stream a file from disk in fixed-size chunks, recording each chunk as it
/// is handed to the transport.
fn file_stream(
    path: PathBuf,
    progress: SharedProgress,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    futures::stream::try_unfold(
        (path, None::<tokio::fs::File>, progress),
        |(path, file, progress)| async move {
            let mut file = match file {
                Some(file) => file,
                None => tokio::fs::File::open(&path).await?,
            };

            let mut buf = vec![0u8; CHUNK_SIZE];
            let read = file.read(&mut buf).await?;
            if read == 0 {
                return Ok(None);
            }
            buf.truncate(read);
            progress.record(read as u64);

            Ok::<_, std::io::Error>(Some((Bytes::from(buf), (path, Some(file), progress))))
        },
    )
}
