//! End-to-end test: a recorded content mutation lands as one commit on a
//! scripted Git Data API, with every wire call accounted for.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use ghsync::batch::{MemoryStore, PendingStore};
use ghsync::collector::ChangeCollector;
use ghsync::config::SyncConfig;
use ghsync::events::{ContentEvent, EventRecorder, Identity};
use ghsync::remote::GitHubRemote;
use ghsync::sync::{JobScheduler, SyncJob, SyncOutcome};
use ghsync::types::CommitAuthor;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REPO: &str = "octocat/blog";
const BRANCH: &str = "main";

struct EntrySaved;

impl ContentEvent for EntrySaved {
    fn category(&self) -> &str {
        "entry.saved"
    }

    fn commit_message(&self) -> Option<String> {
        Some("Saved entry 'test'".to_string())
    }

    fn identity(&self) -> Option<Identity> {
        Some(Identity {
            name: Some("Alice".to_string()),
            email: "alice@example.com".to_string(),
        })
    }
}

struct NoopScheduler;

impl JobScheduler for NoopScheduler {
    fn schedule(&self) {}
}

/// Script an empty remote branch plus the full write sequence.
async fn mount_empty_branch(server: &MockServer) {
    // Head resolution happens once for the diff and once for the commit base.
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/git/ref/heads/{}", REPO, BRANCH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ref": format!("refs/heads/{}", BRANCH),
            "object": { "sha": "head1", "type": "commit" }
        })))
        .expect(2)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/git/commits/head1", REPO)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "sha": "head1",
            "tree": { "sha": "base1" }
        })))
        .expect(2)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/git/trees/base1", REPO)))
        .and(query_param("recursive", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "sha": "base1",
            "tree": []
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/repos/{}/git/blobs", REPO)))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(serde_json::json!({ "sha": "blob1" })),
        )
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/repos/{}/git/trees", REPO)))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(serde_json::json!({ "sha": "tree1" })),
        )
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/repos/{}/git/commits", REPO)))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(serde_json::json!({ "sha": "commit1" })),
        )
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("PATCH"))
        .and(path(format!("/repos/{}/git/refs/heads/{}", REPO, BRANCH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ref": format!("refs/heads/{}", BRANCH),
            "object": { "sha": "commit1" }
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn recorded_edit_lands_as_one_commit() {
    let server = MockServer::start().await;
    mount_empty_branch(&server).await;

    let temp = TempDir::new().unwrap();
    std::fs::create_dir_all(temp.path().join("content")).unwrap();
    std::fs::write(temp.path().join("content/test.md"), "Hello World").unwrap();

    let config = SyncConfig {
        enabled: true,
        repository: REPO.to_string(),
        token: "test-token".to_string(),
        paths: vec!["content".to_string()],
        ..SyncConfig::default()
    };

    let remote = GitHubRemote::with_api_base(
        REPO,
        BRANCH,
        "test-token",
        CommitAuthor::new("Content Sync", "sync@example.com").unwrap(),
        server.uri(),
    )
    .unwrap();

    let store = Arc::new(MemoryStore::new());
    let recorder = EventRecorder::subscribe(
        &config,
        store.clone() as Arc<dyn PendingStore>,
        Arc::new(NoopScheduler),
    )
    .unwrap();
    let job = SyncJob::new(
        store.clone() as Arc<dyn PendingStore>,
        Arc::new(remote),
        ChangeCollector::new(temp.path(), config.paths.clone()),
    )
    .with_backoff(vec![Duration::ZERO]);

    recorder.record(&EntrySaved);

    let outcome = job.run().await.unwrap();
    assert_eq!(
        outcome,
        SyncOutcome::Committed {
            sha: "commit1".to_string(),
            files: 1
        }
    );

    // Wire-level details the mount expectations cannot express.
    let requests = server.received_requests().await.unwrap();

    let blob_body: serde_json::Value = requests
        .iter()
        .find(|r| r.url.path().ends_with("/git/blobs"))
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .unwrap();
    assert_eq!(blob_body["encoding"], "base64");
    assert_eq!(
        blob_body["content"],
        base64::engine::general_purpose::STANDARD.encode(b"Hello World")
    );

    let tree_body: serde_json::Value = requests
        .iter()
        .find(|r| r.url.path().ends_with("/git/trees") && r.method.as_str() == "POST")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .unwrap();
    assert_eq!(tree_body["base_tree"], "base1");
    let entries = tree_body["tree"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["path"], "content/test.md");
    assert_eq!(entries[0]["sha"], "blob1");

    let commit_body: serde_json::Value = requests
        .iter()
        .find(|r| r.url.path().ends_with("/git/commits") && r.method.as_str() == "POST")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .unwrap();
    assert_eq!(commit_body["message"], "Saved entry 'test'");
    assert_eq!(commit_body["parents"], serde_json::json!(["head1"]));
    assert_eq!(commit_body["author"]["name"], "Alice");
    assert_eq!(commit_body["committer"]["name"], "Content Sync");

    let ref_body: serde_json::Value = requests
        .iter()
        .find(|r| r.method.as_str() == "PATCH")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .unwrap();
    assert_eq!(ref_body["sha"], "commit1");

    // The batch was consumed; a second run has nothing to do.
    assert_eq!(job.run().await.unwrap(), SyncOutcome::Idle);
}

#[tokio::test]
async fn unchanged_working_set_makes_no_write_calls() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/git/ref/heads/{}", REPO, BRANCH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "object": { "sha": "head1" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/git/commits/head1", REPO)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "sha": "head1",
            "tree": { "sha": "base1" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/git/trees/base1", REPO)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "sha": "base1",
            "tree": [
                {
                    "path": "content/test.md",
                    "type": "blob",
                    "mode": "100644",
                    "sha": ghsync::hash::blob_sha(b"Hello World")
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    std::fs::create_dir_all(temp.path().join("content")).unwrap();
    std::fs::write(temp.path().join("content/test.md"), "Hello World").unwrap();

    let remote = GitHubRemote::with_api_base(
        REPO,
        BRANCH,
        "test-token",
        CommitAuthor::new("Content Sync", "sync@example.com").unwrap(),
        server.uri(),
    )
    .unwrap();

    let store = Arc::new(MemoryStore::new());
    store.append(
        ghsync::batch::PendingEvent::now("Saved entry 'test'", None),
        ghsync::batch::PENDING_TTL,
    );

    let job = SyncJob::new(
        store as Arc<dyn PendingStore>,
        Arc::new(remote),
        ChangeCollector::new(temp.path(), vec!["content".to_string()]),
    );

    assert_eq!(job.run().await.unwrap(), SyncOutcome::Clean);
}
