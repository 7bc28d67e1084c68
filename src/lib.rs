//! gitbook-publish: publish gitbook files to content-addressed storage and
//! register the resulting CID on a dCompass project.
//!
//! A run uploads a file set, checks that the repository owner is the GitHub
//! account linked to the project owner's DID, and rewrites the project
//! registry with the new `gitbookCid`.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gitbook_publish::{
//!     context::GithubEvent,
//!     publish::{PublishRequest, Publisher},
//!     registry::{CeramicConfig, CeramicRegistry, DataModel, DidKey},
//!     upload::{FileSet, Web3Storage, Web3StorageConfig},
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let uploader = Web3Storage::new(Web3StorageConfig {
//!     token: "token".into(),
//!     ..Default::default()
//! })?;
//! let registry = CeramicRegistry::new(
//!     CeramicConfig::default(),
//!     DidKey::from_hex(&std::env::var("DID_KEY")?)?,
//!     DataModel::from_path("model.json")?,
//! )?;
//! let context = GithubEvent::from_path(std::env::var("GITHUB_EVENT_PATH")?);
//!
//! let publisher = Publisher::new(Arc::new(uploader), Arc::new(context), Arc::new(registry));
//! let files = FileSet::from_dir("test_files", &[])?;
//! let outcome = publisher
//!     .run(&files, &PublishRequest {
//!         project_id: "kjzl6cwe1jw14...".into(),
//!         registry_key: "appprojects".into(),
//!     })
//!     .await?;
//! println!("{}", outcome.cid());
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod config;
pub mod context;
pub mod error;
pub mod publish;
pub mod registry;
pub mod types;
pub mod upload;

// Re-export main types
pub use error::{PublishError, Result};
pub use publish::{NoOpReason, Outcome, PublishRequest, Publisher};
pub use types::*;
