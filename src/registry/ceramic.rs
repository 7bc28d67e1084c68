//! Ceramic HTTP API client
//!
//! Reads go through the node's stream endpoints:
//! - `GET  /api/v0/streams/{id}` loads a stream's current state
//! - `POST /api/v0/streams` with a deterministic IDX genesis loads a DID's index
//!
//! Writes are signed with the run's [`DidKey`] and posted as whole-content
//! tile commits to `POST /api/v0/commits`. A record that does not exist yet is
//! created with a signed genesis and then linked from the DID's index.
//!
//! Commits are signed JSON: `id` is the genesis commit CID, `prev` the log
//! tip, and `data` the complete new content. A stock Ceramic node expects a
//! dag-jose encoded commit whose `data` is a JSON patch against the previous
//! state, so this write path needs a node or proxy that accepts whole-content
//! JSON commits. Reads work against any node.

use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use super::{DataModel, DidKey, IdentityRegistry, RegistryError};
use crate::types::{AlsoKnownAs, LinkedAccount, ProjectCollection};

pub const TESTNET_NODE_URL: &str = "https://ceramic-clay.3boxlabs.com";
pub const MAINNET_NODE_URL: &str = "https://gateway.ceramic.network";
pub const LOCAL_NODE_URL: &str = "http://localhost:7007";

/// Stream family of per-DID index documents
pub const IDX_FAMILY: &str = "IDX";
/// Alias of the profile record listing linked accounts
pub const ALSO_KNOWN_AS: &str = "alsoKnownAs";

const STREAM_URL_PREFIX: &str = "ceramic://";
const TILE_STREAM_TYPE: u8 = 0;

#[derive(Debug, Clone)]
pub struct CeramicConfig {
    pub node_url: String,
    pub timeout_secs: u64,
    /// Request anchoring of written commits
    pub anchor: bool,
    /// Alias of the profile record holding linked accounts
    pub profile_alias: String,
}

impl Default for CeramicConfig {
    fn default() -> Self {
        Self {
            node_url: TESTNET_NODE_URL.to_string(),
            timeout_secs: 300,
            anchor: true,
            profile_alias: ALSO_KNOWN_AS.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamResponse {
    pub stream_id: String,
    pub state: StreamState,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamState {
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub metadata: StreamMetadata,
    #[serde(default)]
    pub log: Vec<LogEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamMetadata {
    #[serde(default)]
    pub controllers: Vec<String>,
    #[serde(default)]
    pub family: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogEntry {
    pub cid: String,
}

impl StreamResponse {
    /// CID of the latest commit in the stream log.
    fn tip(&self) -> Result<&str, RegistryError> {
        self.state
            .log
            .last()
            .map(|entry| entry.cid.as_str())
            .ok_or_else(|| {
                RegistryError::InvalidResponse(format!("stream {} has an empty log", self.stream_id))
            })
    }

    /// CID of the genesis commit, which identifies the stream in commits.
    fn genesis(&self) -> Result<&str, RegistryError> {
        self.state
            .log
            .first()
            .map(|entry| entry.cid.as_str())
            .ok_or_else(|| {
                RegistryError::InvalidResponse(format!("stream {} has an empty log", self.stream_id))
            })
    }

    /// Record stream referenced by an index entry.
    fn index_reference(&self, definition_id: &str) -> Option<String> {
        self.state
            .content
            .get(definition_id)
            .and_then(Value::as_str)
            .map(|r| strip_stream_prefix(r).to_string())
    }
}

fn strip_stream_prefix(id: &str) -> &str {
    id.strip_prefix(STREAM_URL_PREFIX).unwrap_or(id)
}

/// Registry backed by a Ceramic node, authenticated as one DID.
pub struct CeramicRegistry {
    config: CeramicConfig,
    client: Client,
    did: DidKey,
    model: DataModel,
}

impl CeramicRegistry {
    pub fn new(config: CeramicConfig, did: DidKey, model: DataModel) -> Result<Self, RegistryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        info!(did = %did.did(), node = %config.node_url, "Ceramic registry client ready");
        Ok(Self {
            config,
            client,
            did,
            model,
        })
    }

    pub fn did(&self) -> &DidKey {
        &self.did
    }

    fn base_url(&self) -> &str {
        self.config.node_url.trim_end_matches('/')
    }

    fn write_opts(&self) -> Value {
        json!({ "anchor": self.config.anchor, "publish": true })
    }

    /// Load the current state of a stream.
    pub async fn load_stream(&self, stream_id: &str) -> Result<StreamResponse, RegistryError> {
        let stream_id = strip_stream_prefix(stream_id);
        let url = format!(
            "{}/api/v0/streams/{}",
            self.base_url(),
            urlencoding::encode(stream_id)
        );
        debug!(stream_id, "Loading stream");

        let response = self.client.get(&url).send().await?;
        Self::handle_response(response, stream_id).await
    }

    /// Load a DID's IDX index through its deterministic genesis.
    pub async fn load_index(&self, did: &str) -> Result<StreamResponse, RegistryError> {
        let url = format!("{}/api/v0/streams", self.base_url());
        let body = json!({
            "type": TILE_STREAM_TYPE,
            "genesis": { "header": { "controllers": [did], "family": IDX_FAMILY } },
            "opts": { "anchor": false, "publish": false }
        });
        debug!(did, "Loading IDX index");

        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;
        Self::handle_response(response, did).await
    }

    /// Content of the record `alias` in `did`'s index, if it exists.
    async fn read_record(&self, did: &str, alias: &str) -> Result<Option<Value>, RegistryError> {
        let definition_id = self.model.definition(alias)?;

        let index = match self.load_index(did).await {
            Ok(index) => index,
            Err(RegistryError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let Some(record_id) = index.index_reference(definition_id) else {
            debug!(did, alias, "No index entry for alias");
            return Ok(None);
        };

        match self.load_stream(&record_id).await {
            Ok(record) if record.state.content.is_null() => Ok(None),
            Ok(record) => Ok(Some(record.state.content)),
            Err(RegistryError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_tile(&self, content: &Value) -> Result<StreamResponse, RegistryError> {
        let genesis_header = json!({ "controllers": [self.did.did()] });
        let jws = self.did.sign_json(&json!({ "header": genesis_header, "data": content }))?;

        let url = format!("{}/api/v0/streams", self.base_url());
        let body = json!({
            "type": TILE_STREAM_TYPE,
            "genesis": { "header": genesis_header, "data": content, "jws": jws },
            "opts": self.write_opts()
        });

        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;
        let created: StreamResponse = Self::handle_response(response, "genesis").await?;
        info!(stream_id = %created.stream_id, "Created record stream");
        Ok(created)
    }

    async fn update_tile(
        &self,
        stream: &StreamResponse,
        content: &Value,
    ) -> Result<StreamResponse, RegistryError> {
        let payload = json!({
            "id": stream.genesis()?,
            "prev": stream.tip()?,
            "header": {},
            "data": content
        });
        let jws = self.did.sign_json(&payload)?;

        let url = format!("{}/api/v0/commits", self.base_url());
        let body = json!({
            "streamId": stream.stream_id,
            "commit": { "payload": payload, "jws": jws },
            "opts": self.write_opts()
        });

        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;
        Self::handle_response(response, &stream.stream_id).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        resource: &str,
    ) -> Result<T, RegistryError> {
        if response.status() == StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(resource.to_string()));
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Server {
                status,
                message: body,
            });
        }

        let body = response
            .json()
            .await
            .map_err(|e| RegistryError::InvalidResponse(e.to_string()))?;
        Ok(body)
    }
}

#[async_trait::async_trait]
impl IdentityRegistry for CeramicRegistry {
    async fn resolve_linked_accounts(&self, did: &str) -> Result<Vec<LinkedAccount>, RegistryError> {
        let Some(content) = self.read_record(did, &self.config.profile_alias).await? else {
            return Ok(Vec::new());
        };
        let profile: AlsoKnownAs = serde_json::from_value(content)?;
        Ok(profile.accounts)
    }

    async fn get_collection(&self, key: &str) -> Result<ProjectCollection, RegistryError> {
        match self.read_record(self.did.did(), key).await? {
            Some(content) => Ok(serde_json::from_value(content)?),
            None => Ok(ProjectCollection::default()),
        }
    }

    async fn set_collection(
        &self,
        key: &str,
        collection: &ProjectCollection,
    ) -> Result<ProjectCollection, RegistryError> {
        let definition_id = self.model.definition(key)?.to_string();
        let content = serde_json::to_value(collection)?;
        let index = self.load_index(self.did.did()).await?;

        let committed = match index.index_reference(&definition_id) {
            Some(record_id) => {
                let record = self.load_stream(&record_id).await?;
                self.update_tile(&record, &content).await?
            }
            None => {
                let record = self.create_tile(&content).await?;
                let mut entries = index.state.content.as_object().cloned().unwrap_or_default();
                entries.insert(
                    definition_id,
                    Value::String(format!("{}{}", STREAM_URL_PREFIX, record.stream_id)),
                );
                self.update_tile(&index, &Value::Object(entries)).await?;
                record
            }
        };

        info!(key, stream_id = %committed.stream_id, "Committed collection");
        Ok(serde_json::from_value(committed.state.content)?)
    }

    async fn load_project_owner(&self, project_id: &str) -> Result<String, RegistryError> {
        let stream = self.load_stream(project_id).await?;
        stream
            .state
            .metadata
            .controllers
            .first()
            .cloned()
            .ok_or_else(|| RegistryError::NoController(stream.stream_id.clone()))
    }
}
