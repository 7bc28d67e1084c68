//! Run configuration
//!
//! CLI arguments with environment fallbacks, so the step can be driven
//! entirely from a workflow's `env:` block or a local `.env` file.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::registry::ceramic::{ALSO_KNOWN_AS, LOCAL_NODE_URL, MAINNET_NODE_URL, TESTNET_NODE_URL};
use crate::upload::web3::{DEFAULT_API_URL, DEFAULT_GATEWAY_URL};

/// Ceramic network to publish against
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CeramicNetwork {
    Testnet,
    Mainnet,
    Local,
}

impl CeramicNetwork {
    pub fn node_url(&self) -> &'static str {
        match self {
            CeramicNetwork::Testnet => TESTNET_NODE_URL,
            CeramicNetwork::Mainnet => MAINNET_NODE_URL,
            CeramicNetwork::Local => LOCAL_NODE_URL,
        }
    }
}

/// Publish gitbook files and link their CID to a registered project
#[derive(Parser, Debug, Clone)]
#[command(name = "gitbook-publish")]
#[command(about = "Publish gitbook files to Web3.Storage and register the CID on the project")]
pub struct Args {
    /// Web3.Storage API token
    #[arg(long, env = "WEB3STORAGE_TOKEN", hide_env_values = true)]
    pub web3storage_token: String,

    /// Web3.Storage API endpoint
    #[arg(long, env = "WEB3STORAGE_API_URL", default_value = DEFAULT_API_URL)]
    pub web3storage_api_url: String,

    /// IPFS gateway used to list the stored files after upload
    #[arg(long, env = "WEB3STORAGE_GATEWAY_URL", default_value = DEFAULT_GATEWAY_URL)]
    pub web3storage_gateway_url: String,

    /// Hex-encoded Ed25519 seed of the publishing DID
    #[arg(long, env = "DID_KEY", hide_env_values = true)]
    pub did_key: String,

    /// Stream id of the project to update
    #[arg(long, env = "DCOMPASS_PROJECT_ID")]
    pub project_id: String,

    /// GitHub Actions event payload
    #[arg(long, env = "GITHUB_EVENT_PATH")]
    pub event_path: PathBuf,

    /// Directory holding the files to publish
    #[arg(long, env = "FILES_PATH", default_value = "test_files")]
    pub files_path: PathBuf,

    /// Comma-separated names or relative paths to leave out of the upload
    #[arg(long, env = "FILES_TO_IGNORE")]
    pub files_to_ignore: Option<String>,

    /// Ceramic network
    #[arg(long, env = "CERAMIC_NETWORK", value_enum, default_value = "testnet")]
    pub ceramic_network: CeramicNetwork,

    /// Explicit Ceramic node URL (overrides the network default)
    #[arg(long, env = "CERAMIC_URL")]
    pub ceramic_url: Option<String>,

    /// Published data model mapping aliases to definitions
    #[arg(long, env = "MODEL_PATH", default_value = "model.json")]
    pub model_path: PathBuf,

    /// Registry alias of the project collection
    #[arg(long, env = "REGISTRY_KEY", default_value = "appprojects")]
    pub registry_key: String,

    /// Registry alias of the linked-accounts profile
    #[arg(long, env = "PROFILE_KEY", default_value = ALSO_KNOWN_AS)]
    pub profile_key: String,

    /// Request timeout for storage and registry calls, in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "300")]
    pub request_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Effective Ceramic node URL
    pub fn ceramic_node_url(&self) -> &str {
        self.ceramic_url
            .as_deref()
            .unwrap_or_else(|| self.ceramic_network.node_url())
    }

    /// Parsed ignore list
    pub fn ignore_list(&self) -> Vec<String> {
        self.files_to_ignore
            .as_deref()
            .map(crate::upload::files::parse_ignore_list)
            .unwrap_or_default()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.web3storage_token.trim().is_empty() {
            return Err("WEB3STORAGE_TOKEN must not be empty".to_string());
        }
        if self.project_id.trim().is_empty() {
            return Err("DCOMPASS_PROJECT_ID must not be empty".to_string());
        }
        if self.registry_key.trim().is_empty() {
            return Err("REGISTRY_KEY must not be empty".to_string());
        }

        let key = self.did_key.trim();
        if key.len() != 64 || !key.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err("DID_KEY must be 64 hex characters (32-byte seed)".to_string());
        }

        if self.request_timeout_secs == 0 {
            return Err("REQUEST_TIMEOUT_SECS must be greater than zero".to_string());
        }

        Ok(())
    }
}
