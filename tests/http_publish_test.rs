//! End-to-end publish against mocked storage and Ceramic nodes

use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gitbook_publish::context::GithubEvent;
use gitbook_publish::registry::{CeramicConfig, CeramicRegistry, DataModel, DidKey};
use gitbook_publish::upload::{FileSet, Web3Storage, Web3StorageConfig};
use gitbook_publish::{NoOpReason, Outcome, PublishError, PublishRequest, Publisher};

const SEED_HEX: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";
const OWNER_DID: &str = "did:key:z6MkProjectOwner";
const PROJECT_ID: &str = "kjzproject";
const PROFILE_DEF: &str = "kjzl6cwe1jw14profile";
const PROJECTS_DEF: &str = "kjzl6cwe1jw14projects";
const UPLOADED_CID: &str = "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi";

fn stream(stream_id: &str, content: Value, controllers: &[&str]) -> Value {
    json!({
        "streamId": stream_id,
        "state": {
            "content": content,
            "metadata": { "controllers": controllers },
            "log": [{ "cid": format!("bagcqcera{}", stream_id) }]
        }
    })
}

fn push_event(owner: &str) -> Value {
    json!({
        "commits": [
            { "author": { "name": "Ada", "email": "ada@example.com", "username": "ada" } }
        ],
        "repository": { "owner": { "login": owner } }
    })
}

fn book() -> (TempDir, FileSet) {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("README.md"), "# Handbook\n").unwrap();
    std::fs::write(dir.path().join("SUMMARY.md"), "* [Intro](README.md)\n").unwrap();
    let files = FileSet::from_dir(dir.path(), &[]).unwrap();
    (dir, files)
}

async fn mount_storage(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "cid": UPLOADED_CID })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_index(server: &MockServer, did: &str, content: Value) {
    Mock::given(method("POST"))
        .and(path("/api/v0/streams"))
        .and(body_partial_json(json!({
            "genesis": { "header": { "controllers": [did], "family": "IDX" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(stream("index", content, &[did])))
        .mount(server)
        .await;
}

async fn mount_get(server: &MockServer, stream_id: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v0/streams/{}", stream_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Project stream controlled by the owner, whose profile links `accounts`.
async fn mount_owner(server: &MockServer, accounts: Value) {
    mount_get(
        server,
        PROJECT_ID,
        stream(PROJECT_ID, json!({ "name": "handbook" }), &[OWNER_DID]),
    )
    .await;
    mount_index(server, OWNER_DID, json!({ PROFILE_DEF: "ceramic://kjzprofile" })).await;
    mount_get(
        server,
        "kjzprofile",
        stream("kjzprofile", json!({ "accounts": accounts }), &[OWNER_DID]),
    )
    .await;
}

fn publisher(storage: &MockServer, ceramic: &MockServer, event: Value) -> Publisher {
    let uploader = Web3Storage::new(Web3StorageConfig {
        api_url: storage.uri(),
        token: "test-token".into(),
        gateway_url: storage.uri(),
        upload_name: Some("gitbook-kjzproject".into()),
        timeout_secs: 5,
    })
    .unwrap();

    let model = DataModel::default()
        .with_definition("appprojects", PROJECTS_DEF)
        .with_definition("alsoKnownAs", PROFILE_DEF);
    let registry = CeramicRegistry::new(
        CeramicConfig {
            node_url: ceramic.uri(),
            timeout_secs: 5,
            anchor: false,
            profile_alias: "alsoKnownAs".into(),
        },
        DidKey::from_hex(SEED_HEX).unwrap(),
        model,
    )
    .unwrap();

    Publisher::new(
        Arc::new(uploader),
        Arc::new(GithubEvent::new(event)),
        Arc::new(registry),
    )
}

fn request() -> PublishRequest {
    PublishRequest {
        project_id: PROJECT_ID.into(),
        registry_key: "appprojects".into(),
    }
}

#[tokio::test]
async fn test_publish_commits_new_gitbook_cid() {
    let storage = MockServer::start().await;
    let ceramic = MockServer::start().await;
    let publisher_did = DidKey::from_hex(SEED_HEX).unwrap().did().to_string();

    mount_storage(&storage).await;
    mount_owner(&ceramic, json!([{ "host": "github.com", "id": "octo-org" }])).await;
    mount_index(&ceramic, &publisher_did, json!({ PROJECTS_DEF: "ceramic://kjzprojects" })).await;
    mount_get(
        &ceramic,
        "kjzprojects",
        stream(
            "kjzprojects",
            json!({ "projects": [
                { "id": PROJECT_ID, "name": "handbook" },
                { "id": "kjzother", "gitbookCid": "bafyX" }
            ]}),
            &[publisher_did.as_str()],
        ),
    )
    .await;

    let committed = json!({ "projects": [
        { "id": "kjzother", "gitbookCid": "bafyX" },
        { "id": PROJECT_ID, "name": "handbook", "gitbookCid": UPLOADED_CID }
    ]});
    Mock::given(method("POST"))
        .and(path("/api/v0/commits"))
        .and(body_partial_json(json!({
            "streamId": "kjzprojects",
            "commit": { "payload": { "data": committed } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(stream(
            "kjzprojects",
            committed.clone(),
            &[publisher_did.as_str()],
        )))
        .expect(1)
        .mount(&ceramic)
        .await;

    let (_dir, files) = book();
    let outcome = publisher(&storage, &ceramic, push_event("octo-org"))
        .run(&files, &request())
        .await
        .unwrap();

    match outcome {
        Outcome::Published { cid, collection } => {
            assert_eq!(cid.as_str(), UPLOADED_CID);
            assert_eq!(collection.len(), 2);
            assert_eq!(
                collection.find(PROJECT_ID).unwrap().gitbook_cid.as_ref(),
                Some(&cid)
            );
        }
        other => panic!("expected Published, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unlinked_owner_uploads_but_never_commits() {
    let storage = MockServer::start().await;
    let ceramic = MockServer::start().await;

    mount_storage(&storage).await;
    mount_owner(&ceramic, json!([{ "host": "twitter.com", "id": "octo" }])).await;
    Mock::given(method("POST"))
        .and(path("/api/v0/commits"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&ceramic)
        .await;

    let (_dir, files) = book();
    let outcome = publisher(&storage, &ceramic, push_event("octo-org"))
        .run(&files, &request())
        .await
        .unwrap();

    assert_eq!(outcome.cid().as_str(), UPLOADED_CID);
    assert!(matches!(
        outcome,
        Outcome::NoOp {
            reason: NoOpReason::NoGithubAccount,
            ..
        }
    ));
}

#[tokio::test]
async fn test_rejected_upload_never_reaches_ceramic() {
    let storage = MockServer::start().await;
    let ceramic = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&storage)
        .await;

    let (_dir, files) = book();
    let err = publisher(&storage, &ceramic, push_event("octo-org"))
        .run(&files, &request())
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::Transfer(_)));
    assert!(ceramic.received_requests().await.unwrap().is_empty());
}
