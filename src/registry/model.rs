//! Published data model
//!
//! Maps human-readable aliases (`alsoKnownAs`, `appprojects`, ...) to the
//! definition stream ids that key entries in a DID's IDX index.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::RegistryError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataModel {
    #[serde(default)]
    pub schemas: HashMap<String, String>,
    #[serde(default)]
    pub definitions: HashMap<String, String>,
    #[serde(default)]
    pub tiles: HashMap<String, String>,
}

impl DataModel {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| RegistryError::Model {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Definition stream id for an alias.
    pub fn definition(&self, alias: &str) -> Result<&str, RegistryError> {
        self.definitions
            .get(alias)
            .map(String::as_str)
            .ok_or_else(|| RegistryError::UnknownAlias(alias.to_string()))
    }

    pub fn with_definition(mut self, alias: impl Into<String>, stream_id: impl Into<String>) -> Self {
        self.definitions.insert(alias.into(), stream_id.into());
        self
    }
}
