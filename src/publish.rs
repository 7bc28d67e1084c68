//! Publish orchestration
//!
//! Runs the stages of a publish strictly in order:
//! 1. Upload the file set and obtain its CID, then look up its status and
//!    list the stored files (both best effort)
//! 2. Resolve the CI context (commit authors, repository owner)
//! 3. Resolve the DID controlling the target project
//! 4. Check that DID links a `github.com` account equal to the repository owner
//! 5. Load the registry collection and find the target project
//! 6. Replace the project's `gitbookCid` with the new CID
//! 7. Write the collection back
//!
//! Authorization gaps and a missing project end the run as a no-op. There is
//! no concurrency guard between stage 5 and stage 7: the last writer wins.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::context::ContextResolver;
use crate::error::{PublishError, Result};
use crate::registry::IdentityRegistry;
use crate::types::{ContentIdentifier, LinkedAccount, ProjectCollection};
use crate::upload::{ContentUploader, FileSet};

/// Run-scoped inputs.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    /// Stream id of the project to update
    pub project_id: String,
    /// Registry alias of the project collection
    pub registry_key: String,
}

/// Why a run ended without writing to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoOpReason {
    NoLinkedAccounts,
    NoGithubAccount,
    OwnerMismatch {
        repository_owner: String,
        linked_account: String,
    },
    ProjectNotFound(String),
}

impl fmt::Display for NoOpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoOpReason::NoLinkedAccounts => write!(f, "project owner has no linked accounts"),
            NoOpReason::NoGithubAccount => write!(f, "project owner has no linked github.com account"),
            NoOpReason::OwnerMismatch {
                repository_owner,
                linked_account,
            } => write!(
                f,
                "repository owner {} is not the linked github account {}",
                repository_owner, linked_account
            ),
            NoOpReason::ProjectNotFound(id) => write!(f, "project {} is not in the registry", id),
        }
    }
}

/// Terminal state of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Published {
        cid: ContentIdentifier,
        collection: ProjectCollection,
    },
    NoOp {
        cid: ContentIdentifier,
        reason: NoOpReason,
    },
}

impl Outcome {
    pub fn cid(&self) -> &ContentIdentifier {
        match self {
            Outcome::Published { cid, .. } | Outcome::NoOp { cid, .. } => cid,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Published { .. } => "published",
            Outcome::NoOp { .. } => "noop",
        }
    }
}

/// Find the linked GitHub account that authorizes `repository_owner`.
///
/// The owner login is compared against the account's `id`.
pub fn authorize<'a>(
    accounts: &'a [LinkedAccount],
    repository_owner: &str,
) -> std::result::Result<&'a LinkedAccount, NoOpReason> {
    if accounts.is_empty() {
        return Err(NoOpReason::NoLinkedAccounts);
    }
    let github = accounts
        .iter()
        .find(|a| a.is_github())
        .ok_or(NoOpReason::NoGithubAccount)?;

    if github.id != repository_owner {
        return Err(NoOpReason::OwnerMismatch {
            repository_owner: repository_owner.to_string(),
            linked_account: github.id.clone(),
        });
    }
    Ok(github)
}

/// Build the collection with `project_id`'s `gitbookCid` set to `cid`.
///
/// Untouched projects keep their order; the updated project is appended.
/// Returns `None` when the project is absent.
pub fn upsert_project(
    collection: &ProjectCollection,
    project_id: &str,
    cid: &ContentIdentifier,
) -> Option<ProjectCollection> {
    let updated = collection.find(project_id)?.clone().with_gitbook_cid(cid.clone());

    let mut projects: Vec<_> = collection
        .projects
        .iter()
        .filter(|p| p.id != project_id)
        .cloned()
        .collect();
    projects.push(updated);

    Some(ProjectCollection::new(projects))
}

/// Wires the uploader, context resolver and registry into one run.
pub struct Publisher {
    uploader: Arc<dyn ContentUploader>,
    context: Arc<dyn ContextResolver>,
    registry: Arc<dyn IdentityRegistry>,
}

impl Publisher {
    pub fn new(
        uploader: Arc<dyn ContentUploader>,
        context: Arc<dyn ContextResolver>,
        registry: Arc<dyn IdentityRegistry>,
    ) -> Self {
        Self {
            uploader,
            context,
            registry,
        }
    }

    pub async fn run(&self, files: &FileSet, request: &PublishRequest) -> Result<Outcome> {
        // Upload
        let cid = self.uploader.upload(files).await?;
        match self.uploader.status(&cid).await {
            Ok(status) => info!(
                cid = %cid,
                dag_size = status.dag_size,
                pins = status.pins.len(),
                deals = status.deals.len(),
                "Upload status"
            ),
            Err(e) => warn!(cid = %cid, error = %e, "Upload status lookup failed"),
        }
        match self.uploader.get(&cid).await {
            Ok(stored) => {
                debug!(files = ?stored.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(), "Stored files");
                info!(cid = %cid, files = stored.len(), "Retrieved stored files")
            }
            Err(e) => warn!(cid = %cid, error = %e, "Stored file retrieval failed"),
        }

        // Context
        let ctx = self.context.resolve_context()?;
        debug!(actors = ?ctx.actors, "Commit authors");
        info!(repository_owner = %ctx.repository_owner, authors = ctx.actors.len(), "Resolved run context");

        // Project owner
        let owner = self
            .registry
            .load_project_owner(&request.project_id)
            .await
            .map_err(|source| PublishError::OwnerLookup {
                project_id: request.project_id.clone(),
                source,
            })?;
        info!(project_id = %request.project_id, owner = %owner, "Resolved project owner");

        // Authorization
        let accounts = self
            .registry
            .resolve_linked_accounts(&owner)
            .await
            .map_err(|source| PublishError::ProfileLookup {
                did: owner.clone(),
                source,
            })?;
        debug!(accounts = ?accounts, "Owner linked accounts");

        let account = match authorize(&accounts, &ctx.repository_owner) {
            Ok(account) => account,
            Err(reason) => return Ok(noop(cid, reason)),
        };
        info!(github = %account.id, "Repository owner authorized");

        // Load and upsert
        let collection = self
            .registry
            .get_collection(&request.registry_key)
            .await
            .map_err(|source| PublishError::RegistryRead {
                key: request.registry_key.clone(),
                source,
            })?;
        debug!(projects = collection.len(), "Loaded registry collection");

        let Some(updated) = upsert_project(&collection, &request.project_id, &cid) else {
            return Ok(noop(
                cid,
                NoOpReason::ProjectNotFound(request.project_id.clone()),
            ));
        };

        // Commit
        let committed = match self
            .registry
            .set_collection(&request.registry_key, &updated)
            .await
        {
            Ok(committed) => committed,
            Err(source) => {
                warn!(cid = %cid, project_id = %request.project_id, "Content uploaded but registry not updated");
                return Err(PublishError::RegistryWrite { cid, source });
            }
        };

        info!(cid = %cid, project_id = %request.project_id, "Registry updated");
        Ok(Outcome::Published {
            cid,
            collection: committed,
        })
    }
}

fn noop(cid: ContentIdentifier, reason: NoOpReason) -> Outcome {
    info!(cid = %cid, reason = %reason, "Nothing to publish");
    Outcome::NoOp { cid, reason }
}
