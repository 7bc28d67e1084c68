//! Shared data model: content identifiers, actors, linked accounts and the
//! project registry document.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Host value a linked account must carry to count as a GitHub login.
pub const GITHUB_HOST: &str = "github.com";

/// Content-derived identifier returned by the storage backend.
///
/// Kept as the exact string the backend produced so it round-trips through
/// the registry unchanged. Use [`ContentIdentifier::parse`] when the value
/// must be a well-formed CID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentIdentifier(String);

impl ContentIdentifier {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Validate a CID string (v0 or v1, any multibase) and keep it as given.
    pub fn parse(value: &str) -> Result<Self, cid::Error> {
        cid::Cid::from_str(value)?;
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<cid::Cid> for ContentIdentifier {
    fn from(cid: cid::Cid) -> Self {
        Self(cid.to_string())
    }
}

impl fmt::Display for ContentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Commit author taken from the CI event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// External account claimed by a DID in its `alsoKnownAs` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedAccount {
    pub host: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

impl LinkedAccount {
    pub fn new(host: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            id: id.into(),
            claim: None,
            protocol: None,
        }
    }

    pub fn is_github(&self) -> bool {
        self.host == GITHUB_HOST
    }
}

/// Profile record listing a DID's linked accounts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlsoKnownAs {
    #[serde(default)]
    pub accounts: Vec<LinkedAccount>,
}

/// A project entry inside the registry collection.
///
/// Only `id` and `gitbookCid` are interpreted; every other field is carried
/// through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    #[serde(rename = "gitbookCid", default)]
    pub gitbook_cid: Option<ContentIdentifier>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

impl Project {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            gitbook_cid: None,
            rest: serde_json::Map::new(),
        }
    }

    pub fn with_gitbook_cid(mut self, cid: ContentIdentifier) -> Self {
        self.gitbook_cid = Some(cid);
        self
    }
}

/// The single registry document holding every project for one DID namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectCollection {
    #[serde(default)]
    pub projects: Vec<Project>,
}

impl ProjectCollection {
    pub fn new(projects: Vec<Project>) -> Self {
        Self { projects }
    }

    pub fn find(&self, project_id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == project_id)
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_project_preserves_unknown_fields() {
        let raw = json!({
            "id": "p1",
            "name": "Knowsis",
            "gitbookCid": null,
            "squads": [{"name": "core"}]
        });

        let project: Project = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(project.id, "p1");
        assert!(project.gitbook_cid.is_none());
        assert_eq!(project.rest.get("name"), Some(&json!("Knowsis")));

        let back = serde_json::to_value(&project).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn test_project_missing_gitbook_cid_defaults_to_none() {
        let project: Project = serde_json::from_value(json!({"id": "p2"})).unwrap();
        assert!(project.gitbook_cid.is_none());
    }

    #[test]
    fn test_collection_missing_projects_is_empty() {
        let collection: ProjectCollection = serde_json::from_value(json!({})).unwrap();
        assert!(collection.is_empty());
    }

    #[test]
    fn test_content_identifier_parse() {
        use multihash_codetable::{Code, MultihashDigest};

        let hash = Code::Sha2_256.digest(b"gitbook");
        let cid = cid::Cid::new_v1(0x55, hash);
        let parsed = ContentIdentifier::parse(&cid.to_string()).unwrap();
        assert_eq!(parsed.as_str(), cid.to_string());

        assert!(ContentIdentifier::parse("not-a-cid").is_err());
    }

    #[test]
    fn test_content_identifier_keeps_backend_encoding() {
        use multihash_codetable::{Code, MultihashDigest};

        let cid = cid::Cid::new_v1(0x70, Code::Sha2_256.digest(b"gitbook"));
        let upper = cid.to_string().to_uppercase();

        let parsed = ContentIdentifier::parse(&upper).unwrap();
        assert_eq!(parsed.as_str(), upper);
        assert_ne!(parsed.as_str(), cid.to_string());
    }

    #[test]
    fn test_linked_account_github_host() {
        assert!(LinkedAccount::new("github.com", "octocat").is_github());
        assert!(!LinkedAccount::new("twitter.com", "octocat").is_github());
    }
}
