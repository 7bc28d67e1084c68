//! CI event context
//!
//! Reads the GitHub Actions event payload (the JSON file named by
//! `GITHUB_EVENT_PATH`) and extracts the commit authors and the repository
//! owner login. No network access.

use serde_json::Value;
use std::borrow::Cow;
use std::path::PathBuf;
use thiserror::Error;

use crate::types::Actor;

#[derive(Debug, Error)]
pub enum ContextError {
    /// Event file could not be read
    #[error("Failed to read event payload {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Event file is not JSON
    #[error("Event payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// `commits` absent or not an array
    #[error("Event payload has no commits array")]
    MissingCommits,

    /// Commit author missing or not an author object
    #[error("Commit {index} has a malformed author: {reason}")]
    MalformedAuthor { index: usize, reason: String },

    /// `repository.owner.login` absent or empty
    #[error("Event payload has no repository owner login")]
    MissingRepositoryOwner,
}

/// What the orchestrator needs to know about the triggering event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub actors: Vec<Actor>,
    pub repository_owner: String,
}

/// Source of the run context.
pub trait ContextResolver: Send + Sync {
    fn resolve_context(&self) -> Result<RunContext, ContextError>;
}

/// Event payload delivered by GitHub Actions.
///
/// A path-backed event is read when the context is resolved, not when it is
/// constructed.
#[derive(Debug, Clone)]
pub struct GithubEvent {
    source: EventSource,
}

#[derive(Debug, Clone)]
enum EventSource {
    Path(PathBuf),
    Payload(Value),
}

impl GithubEvent {
    pub fn new(payload: Value) -> Self {
        Self {
            source: EventSource::Payload(payload),
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: EventSource::Path(path.into()),
        }
    }

    fn load(&self) -> Result<Cow<'_, Value>, ContextError> {
        match &self.source {
            EventSource::Payload(payload) => Ok(Cow::Borrowed(payload)),
            EventSource::Path(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| ContextError::Io {
                    path: path.display().to_string(),
                    source: e,
                })?;
                Ok(Cow::Owned(serde_json::from_str(&raw)?))
            }
        }
    }
}

fn actors(payload: &Value) -> Result<Vec<Actor>, ContextError> {
    let commits = payload
        .get("commits")
        .and_then(Value::as_array)
        .ok_or(ContextError::MissingCommits)?;

    commits
        .iter()
        .enumerate()
        .map(|(index, commit)| {
            let author = commit
                .get("author")
                .ok_or_else(|| ContextError::MalformedAuthor {
                    index,
                    reason: "missing author".to_string(),
                })?;
            serde_json::from_value(author.clone()).map_err(|e| ContextError::MalformedAuthor {
                index,
                reason: e.to_string(),
            })
        })
        .collect()
}

fn repository_owner(payload: &Value) -> Result<String, ContextError> {
    payload
        .pointer("/repository/owner/login")
        .and_then(Value::as_str)
        .filter(|login| !login.is_empty())
        .map(str::to_string)
        .ok_or(ContextError::MissingRepositoryOwner)
}

impl ContextResolver for GithubEvent {
    fn resolve_context(&self) -> Result<RunContext, ContextError> {
        let payload = self.load()?;
        Ok(RunContext {
            actors: actors(&payload)?,
            repository_owner: repository_owner(&payload)?,
        })
    }
}
