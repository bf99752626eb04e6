//! Shared utilities for pipeline integration tests.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{self, Layer, SubscriberExt};

use ai_images_processor::lifecycle::{bootstrap, Context};
use ai_images_processor::ProcessorConfig;

pub const REPO: &str = "owner/images";
pub const TOKEN: &str = "hf_test_token";

pub const TREE_PATH: &str = "/api/datasets/owner/images/tree/main";
pub const COMMIT_PATH: &str = "/api/datasets/owner/images/commit/main";
pub const PREUPLOAD_PATH: &str = "/api/datasets/owner/images/preupload/main";
pub const LFS_BATCH_PATH: &str = "/datasets/owner/images.git/info/lfs/objects/batch";
pub const LFS_VERIFY_PATH: &str = "/lfs-verify";
pub const LFS_UPLOAD_TOKEN: &str = "presigned-upload";

/// A fake repository file: path and content.
pub struct FakeFile {
    pub path: &'static str,
    pub content: &'static [u8],
}

/// Two artificial and two human images plus files the loader must ignore.
pub fn standard_files() -> Vec<FakeFile> {
    vec![
        FakeFile { path: "raw/artificial/a1.png", content: b"art-1" },
        FakeFile { path: "raw/artificial/a2.png", content: b"art-2" },
        FakeFile { path: "raw/human/h1.jpg", content: b"human-1" },
        FakeFile { path: "raw/human/h2.jpg", content: b"human-2" },
        FakeFile { path: "raw/human/README.md", content: b"# notes" },
        FakeFile { path: "converted/train/human/old.jpg", content: b"old" },
    ]
}

pub fn tree_json(files: &[FakeFile]) -> serde_json::Value {
    let mut entries = vec![json!({"type": "directory", "oid": "d0", "size": 0, "path": "raw"})];
    for file in files {
        entries.push(json!({
            "type": "file",
            "oid": format!("oid-{}", file.path),
            "size": file.content.len(),
            "path": file.path,
        }));
    }
    serde_json::Value::Array(entries)
}

/// Tree listing answered with the given files.
pub async fn mock_tree(server: &MockServer, files: &[FakeFile]) {
    Mock::given(method("GET"))
        .and(path(TREE_PATH))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(tree_json(files)))
        .mount(server)
        .await;
}

/// Tree listing that fails `fail_count` times with 500 before answering.
pub async fn mock_flaky_tree(server: &MockServer, fail_count: u64, files: &[FakeFile]) {
    Mock::given(method("GET"))
        .and(path(TREE_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream unavailable"))
        .up_to_n_times(fail_count)
        .mount(server)
        .await;

    mock_tree(server, files).await;
}

/// Tree listing that always fails with 500.
pub async fn mock_failing_tree(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(TREE_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream unavailable"))
        .mount(server)
        .await;
}

/// Raw download endpoints for every file.
pub async fn mock_downloads(server: &MockServer, files: &[FakeFile]) {
    for file in files {
        Mock::given(method("GET"))
            .and(path(format!("/datasets/{}/resolve/main/{}", REPO, file.path)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(file.content))
            .mount(server)
            .await;
    }
}

/// Answers preupload requests, classifying every file with the same mode.
struct Preupload(&'static str);

impl Respond for Preupload {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        let files: Vec<_> = body["files"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| json!({"path": f["path"], "uploadMode": self.0, "shouldIgnore": false}))
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({ "files": files }))
    }
}

/// Preupload endpoint answering `"regular"` or `"lfs"` for every file.
pub async fn mock_preupload(server: &MockServer, mode: &'static str) {
    Mock::given(method("POST"))
        .and(path(PREUPLOAD_PATH))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(Preupload(mode))
        .mount(server)
        .await;
}

/// LFS batch endpoint asking for every offered object to be uploaded and verified.
struct LfsBatch(String);

impl Respond for LfsBatch {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        let objects: Vec<_> = body["objects"]
            .as_array()
            .unwrap()
            .iter()
            .map(|o| {
                json!({
                    "oid": o["oid"],
                    "size": o["size"],
                    "actions": {
                        "upload": {
                            "href": format!("{}/lfs-upload/{}", self.0, o["oid"].as_str().unwrap()),
                            "header": {"x-upload-token": LFS_UPLOAD_TOKEN},
                        },
                        "verify": {"href": format!("{}{}", self.0, LFS_VERIFY_PATH)},
                    },
                })
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({"transfer": "basic", "objects": objects}))
    }
}

/// LFS batch, presigned upload and verify endpoints.
pub async fn mock_lfs(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(LFS_BATCH_PATH))
        .and(header("accept", "application/vnd.git-lfs+json"))
        .respond_with(LfsBatch(server.uri()))
        .mount(server)
        .await;

    Mock::given(method("PUT"))
        .and(path_regex("^/lfs-upload/[0-9a-f]{64}$"))
        .and(header("x-upload-token", LFS_UPLOAD_TOKEN))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(LFS_VERIFY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(server)
        .await;
}

/// Preupload (everything inline) plus a commit endpoint that always succeeds.
pub async fn mock_commit(server: &MockServer) {
    mock_preupload(server, "regular").await;
    mock_commit_endpoint(server).await;
}

/// Commit endpoint that always succeeds.
pub async fn mock_commit_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(COMMIT_PATH))
        .and(header("content-type", "application/x-ndjson"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "commitOid": "c0ffee",
            "commitUrl": "https://hub.example/commit/c0ffee",
        })))
        .mount(server)
        .await;
}

/// Commit endpoint that fails `fail_count` times with 429 before succeeding.
pub async fn mock_flaky_commit(server: &MockServer, fail_count: u64) {
    Mock::given(method("POST"))
        .and(path(COMMIT_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .up_to_n_times(fail_count)
        .mount(server)
        .await;

    mock_commit(server).await;
}

/// Number of received requests for a method and path.
pub async fn request_count(server: &MockServer, verb: &str, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == verb && r.url.path() == request_path)
        .count()
}

/// Bodies of every commit request, one entry per NDJSON line.
pub async fn commit_lines(server: &MockServer) -> Vec<Vec<serde_json::Value>> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == "POST" && r.url.path() == COMMIT_PATH)
        .map(|r| {
            String::from_utf8_lossy(&r.body)
                .lines()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect()
        })
        .collect()
}

/// Config pointing at the mock server with zero retry delay.
pub fn test_config(server: &MockServer, workdir: &Path) -> ProcessorConfig {
    let settings = workdir.join("settings.local");
    std::fs::write(&settings, format!("HF_KEY={}\n", TOKEN)).unwrap();

    let mut config = ProcessorConfig::default();
    config.hub.endpoint = server.uri();
    config.hub.timeout_secs = 5;
    config.source.repo = REPO.into();
    config.source.cache_dir = workdir.join(".cache");
    config.publish.repo = REPO.into();
    config.publish.batch_size = 2;
    config.split.test_size = 0.25;
    config.retry.delay_secs = 0.0;
    config.retry.retry_limit = 5;
    config.credentials.settings_path = settings;
    config
}

pub fn context(config: ProcessorConfig) -> Context {
    bootstrap(config).unwrap()
}

pub fn workdir() -> TempDir {
    tempfile::tempdir().unwrap()
}

/// Tracing layer counting WARN events.
#[derive(Clone, Default)]
pub struct WarnCounter(Arc<AtomicUsize>);

impl WarnCounter {
    /// Install as the thread's default subscriber until the guard drops.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for WarnCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: layer::Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}
