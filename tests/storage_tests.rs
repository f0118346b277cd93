//! Route storage backend tests
//!
//! Covers the durable media: merge-before-write for the JSON snapshot,
//! restart round-trips and the object store's local-copy semantics.

use std::collections::HashMap;
use std::sync::Arc;

use bridge::config::StorageConfig;
use bridge::errors::BridgeError;
use bridge::storage::{
    Durability, JsonFileStorage, MemoryObjectClient, ObjectClient, ObjectStorage, RouteStore,
    S3ObjectClient, S3Target, ShardStorage, StorageFactory,
};
use object_store::aws::AmazonS3Builder;
use tempfile::TempDir;

fn sorted(mut entries: Vec<bridge::storage::RouteEntry>) -> Vec<(String, String)> {
    entries.sort_by(|a, b| a.key.cmp(&b.key));
    entries
        .into_iter()
        .map(|e| (e.key, e.destination))
        .collect()
}

// =============================================================================
// JSON snapshot
// =============================================================================

#[tokio::test]
async fn test_json_file_created_when_missing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested/routes.json");

    let store = JsonFileStorage::open(path.to_str().unwrap()).await.unwrap();
    assert!(store.list().await.unwrap().is_empty());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
}

#[tokio::test]
async fn test_json_file_merges_external_edits() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("routes.json");
    let store = JsonFileStorage::open(path.to_str().unwrap()).await.unwrap();

    store.set("a", "https://a.example").await.unwrap();

    // Another writer adds a key behind our back
    std::fs::write(
        &path,
        r#"{"a": "https://a.example", "external": "https://ext.example"}"#,
    )
    .unwrap();

    store.set("b", "https://b.example").await.unwrap();

    let on_disk: HashMap<String, String> =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk.len(), 3);
    assert_eq!(on_disk["external"], "https://ext.example");
    assert_eq!(on_disk["b"], "https://b.example");
}

#[tokio::test]
async fn test_json_file_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("routes.json");
    let path = path.to_str().unwrap();

    {
        let store = JsonFileStorage::open(path).await.unwrap();
        store.set("a", "https://a.example").await.unwrap();
        store.set("h.example/a", "https://h.example/a").await.unwrap();
        store.set("gone", "https://gone.example").await.unwrap();
        store.delete("gone").await.unwrap();
    }

    let reopened = JsonFileStorage::open(path).await.unwrap();
    assert_eq!(
        sorted(reopened.list().await.unwrap()),
        vec![
            ("a".to_string(), "https://a.example".to_string()),
            ("h.example/a".to_string(), "https://h.example/a".to_string()),
        ]
    );
    assert_eq!(reopened.durability(), Durability::WriteThrough);
}

#[tokio::test]
async fn test_json_file_rejects_corrupt_snapshot() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("routes.json");
    std::fs::write(&path, "{ not json").unwrap();

    let result = JsonFileStorage::open(path.to_str().unwrap()).await;
    assert!(matches!(result, Err(BridgeError::Serialization(_))));
}

// =============================================================================
// Shards
// =============================================================================

#[tokio::test]
async fn test_shard_round_trip() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().to_str().unwrap();

    {
        let store = ShardStorage::open(root).await.unwrap();
        store.set("h.example/a b", "https://h.example/").await.unwrap();
        store.set(".hidden", "https://dot.example/").await.unwrap();
        store.set("plain", "https://plain.example/").await.unwrap();
        // Missing keys are not an error at the storage layer
        store.delete("never-there").await.unwrap();
    }

    let reopened = ShardStorage::open(root).await.unwrap();
    assert_eq!(
        sorted(reopened.list().await.unwrap()),
        vec![
            (".hidden".to_string(), "https://dot.example/".to_string()),
            ("h.example/a b".to_string(), "https://h.example/".to_string()),
            ("plain".to_string(), "https://plain.example/".to_string()),
        ]
    );
    assert_eq!(
        reopened.get("plain").await.unwrap().as_deref(),
        Some("https://plain.example/")
    );
    assert_eq!(reopened.get("nope").await.unwrap(), None);
}

#[tokio::test]
async fn test_shard_writes_do_not_touch_other_keys() {
    let dir = TempDir::new().unwrap();
    let store = ShardStorage::open(dir.path().to_str().unwrap()).await.unwrap();

    store.set("a", "https://a.example").await.unwrap();
    store.set("b", "https://b.example").await.unwrap();
    store.delete("a").await.unwrap();

    assert_eq!(
        sorted(store.list().await.unwrap()),
        vec![("b".to_string(), "https://b.example".to_string())]
    );
}

// =============================================================================
// Object store
// =============================================================================

#[tokio::test]
async fn test_object_merges_into_downloaded_copy() {
    let client = Arc::new(MemoryObjectClient::with_object(
        r#"{"existing": "https://existing.example"}"#,
    ));
    let store = ObjectStorage::open(client.clone()).await.unwrap();

    store.set("new", "https://new.example").await.unwrap();

    let remote = client.stored_routes();
    assert_eq!(remote.len(), 2);
    assert_eq!(remote["existing"], "https://existing.example");
    assert_eq!(store.durability(), Durability::ApplyThenPersist);
}

#[tokio::test]
async fn test_object_failed_upload_is_carried_by_next_upload() {
    let client = Arc::new(MemoryObjectClient::new());
    let store = ObjectStorage::open(client.clone()).await.unwrap();

    client.set_offline(true);
    assert!(matches!(
        store.set("a", "https://a.example").await,
        Err(BridgeError::StorageUnavailable(_))
    ));
    // Local copy is ahead of the remote object
    assert_eq!(
        store.get("a").await.unwrap().as_deref(),
        Some("https://a.example")
    );

    client.set_offline(false);
    store.set("b", "https://b.example").await.unwrap();
    let remote = client.stored_routes();
    assert!(remote.contains_key("a"));
    assert!(remote.contains_key("b"));
}

#[tokio::test]
async fn test_object_reload_drops_unsynced_changes() {
    let client = Arc::new(MemoryObjectClient::new());
    let store = ObjectStorage::open(client.clone()).await.unwrap();

    client.set_offline(true);
    let _ = store.set("local-only", "https://local.example").await;
    client.set_offline(false);

    client.put_external(r#"{"remote": "https://remote.example"}"#);
    store.reload().await.unwrap();

    assert_eq!(
        sorted(store.list().await.unwrap()),
        vec![("remote".to_string(), "https://remote.example".to_string())]
    );
}

// =============================================================================
// Factory
// =============================================================================

/// 单连接假 S3：记录请求头，统一回 404
fn spawn_not_found_server() -> (String, std::sync::mpsc::Receiver<String>) {
    use std::io::{BufRead, BufReader, Write};

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            let mut head = String::new();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
                    break;
                }
                head.push_str(&line);
            }
            let _ = tx.send(head);
            let _ = stream.write_all(
                b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
            );
        }
    });
    (format!("http://{}", addr), rx)
}

#[tokio::test]
async fn test_s3_requests_are_signed() {
    let (endpoint, requests) = spawn_not_found_server();
    let target = S3Target {
        bucket: "links".into(),
        object: "routes.json".into(),
        region: Some("eu-west-1".into()),
        endpoint: Some(endpoint),
    };
    let builder = AmazonS3Builder::new()
        .with_access_key_id("AKIDEXAMPLE")
        .with_secret_access_key("secret");
    let client =
        S3ObjectClient::with_builder(builder, &target, std::time::Duration::from_secs(5)).unwrap();

    // 404 视为对象尚未创建
    assert_eq!(client.download().await.unwrap(), None);
    assert_eq!(client.location(), "s3://links/routes.json");

    let head = requests.recv().unwrap();
    assert!(head.starts_with("GET /links/routes.json"), "{}", head);
    assert!(head.contains("AWS4-HMAC-SHA256"), "{}", head);
    assert!(head.contains("AKIDEXAMPLE/"), "{}", head);
    assert!(head.contains("/eu-west-1/s3/aws4_request"), "{}", head);
}

#[tokio::test]
async fn test_factory_builds_each_local_backend() {
    let dir = TempDir::new().unwrap();

    let cases = [
        ("memory://".to_string(), "memory"),
        (
            format!("file://{}", dir.path().join("r.json").display()),
            "json_file",
        ),
        (
            format!("shard://{}", dir.path().join("shards").display()),
            "shard",
        ),
    ];

    for (url, backend) in cases {
        let config = StorageConfig {
            url,
            ..Default::default()
        };
        let store = StorageFactory::create(&config).await.unwrap();
        assert_eq!(store.backend_name(), backend);
    }
}

#[tokio::test]
async fn test_factory_rejects_unknown_scheme() {
    let config = StorageConfig {
        url: "ftp://routes".to_string(),
        ..Default::default()
    };
    assert!(matches!(
        StorageFactory::create(&config).await,
        Err(BridgeError::StorageConfig(_))
    ));
}
