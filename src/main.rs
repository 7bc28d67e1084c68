//! gitbook-publish: CI step publishing gitbook files and registering their CID
//!
//! Exit status is 0 when the registry was updated or the run was a no-op,
//! 1 on configuration errors and fatal publish failures.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gitbook_publish::{
    actions,
    config::Args,
    context::GithubEvent,
    publish::{Outcome, PublishRequest, Publisher},
    registry::{CeramicConfig, CeramicRegistry, DataModel, DidKey},
    upload::{FileSet, Web3Storage, Web3StorageConfig},
};

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("gitbook_publish={},info", args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(outcome) => {
            for (name, value) in [("cid", outcome.cid().as_str()), ("outcome", outcome.label())] {
                if let Err(e) = actions::set_output(name, value) {
                    warn!(error = %e, "Failed to write step output {}", name);
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Publish failed: {:#}", e);
            println!("{}", actions::error_annotation(&format!("{:#}", e)));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<Outcome> {
    info!("Project: {}", args.project_id);
    info!("Files: {}", args.files_path.display());
    info!("Storage: {}", args.web3storage_api_url);
    info!("Ceramic: {}", args.ceramic_node_url());

    let files = FileSet::from_dir(&args.files_path, &args.ignore_list())?;

    let uploader = Web3Storage::new(Web3StorageConfig {
        api_url: args.web3storage_api_url.clone(),
        token: args.web3storage_token.clone(),
        gateway_url: args.web3storage_gateway_url.clone(),
        upload_name: Some(format!("gitbook-{}", args.project_id)),
        timeout_secs: args.request_timeout_secs,
    })?;

    let did = DidKey::from_hex(&args.did_key)?;
    info!("Publishing as {}", did.did());
    let registry = CeramicRegistry::new(
        CeramicConfig {
            node_url: args.ceramic_node_url().to_string(),
            timeout_secs: args.request_timeout_secs,
            anchor: true,
            profile_alias: args.profile_key.clone(),
        },
        did,
        DataModel::from_path(&args.model_path)?,
    )?;

    let context = GithubEvent::from_path(&args.event_path);

    let publisher = Publisher::new(Arc::new(uploader), Arc::new(context), Arc::new(registry));
    let outcome = publisher
        .run(
            &files,
            &PublishRequest {
                project_id: args.project_id.clone(),
                registry_key: args.registry_key.clone(),
            },
        )
        .await?;

    match &outcome {
        Outcome::Published { cid, collection } => {
            info!(cid = %cid, projects = collection.len(), "Published")
        }
        Outcome::NoOp { cid, reason } => info!(cid = %cid, "No-op: {}", reason),
    }
    Ok(outcome)
}
