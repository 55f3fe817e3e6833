//! End-to-end runs of the client against the in-process emulator.

use futures_util::TryStreamExt;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use webhdfs_client::types::{ContentSummaryResponse, FileStatusResponse, FileType, ListStatusResponse};
use webhdfs_client::{ClientConfig, CreateOptions, ReadOptions, WebHdfsClient, WebHdfsError, XAttrEncoding};
use webhdfs_server::{AppState, spawn};

async fn start(require_user: bool) -> ClientConfig {
    let (addr, _) = spawn(SocketAddr::from(([127, 0, 0, 1], 0)), AppState::new(require_user))
        .await
        .expect("Failed to start emulator");
    ClientConfig::new(addr.ip().to_string(), addr.port()).with_timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn create_read_append_round_trip() {
    let client = WebHdfsClient::new(start(false).await.with_user("alice")).unwrap();

    client
        .create_file("user/alice/hello.txt", "hello", &CreateOptions::default())
        .await
        .unwrap();
    client.append_file("/user/alice/hello.txt", ", world").await.unwrap();

    let content = client
        .read_file("user/alice/hello.txt", &ReadOptions::default())
        .await
        .unwrap();
    assert_eq!(&content[..], b"hello, world");
    let range = client
        .read_file("user/alice/hello.txt", &ReadOptions::range(7, 5))
        .await
        .unwrap();
    assert_eq!(&range[..], b"world");

    let status: FileStatusResponse =
        serde_json::from_value(client.get_file_dir_status("user/alice/hello.txt").await.unwrap()).unwrap();
    assert_eq!(status.file_status.kind, FileType::File);
    assert_eq!(status.file_status.length, 12);
    assert_eq!(status.file_status.owner, "alice");
}

#[tokio::test]
async fn overwrite_is_required_to_replace_a_file() {
    let client = WebHdfsClient::new(start(false).await).unwrap();
    client.create_file("f", "one", &CreateOptions::default()).await.unwrap();

    let err = client
        .create_file("f", "two", &CreateOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err.as_remote(), Some(WebHdfsError::Generic { status: 403, .. })));

    client.create_file("f", "two", &CreateOptions::overwrite()).await.unwrap();
    let content = client.read_file("f", &ReadOptions::default()).await.unwrap();
    assert_eq!(&content[..], b"two");
}

#[tokio::test]
async fn missing_paths_are_file_not_found() {
    let client = WebHdfsClient::new(start(false).await).unwrap();

    let err = client
        .read_file("nope", &ReadOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err.as_remote(), Some(WebHdfsError::FileNotFound { status: 404, .. })));
    assert!(err.to_string().contains("FileNotFoundException"));
    assert!(!client.exists_file_dir("nope").await.unwrap());
}

#[tokio::test]
async fn directories_listing_and_summary() {
    let client = WebHdfsClient::new(start(false).await).unwrap();
    assert!(client.make_dir("data/sub", Some("750")).await.unwrap());
    client.create_file("data/a", "12345", &CreateOptions::default()).await.unwrap();

    let listing: ListStatusResponse = serde_json::from_value(client.list_dir("data").await.unwrap()).unwrap();
    let names: Vec<_> = listing
        .file_statuses
        .file_status
        .iter()
        .map(|s| (s.path_suffix.as_str(), s.kind.clone()))
        .collect();
    assert_eq!(names, vec![("a", FileType::File), ("sub", FileType::Directory)]);

    let summary: ContentSummaryResponse =
        serde_json::from_value(client.get_content_summary("data").await.unwrap()).unwrap();
    assert_eq!(summary.content_summary.directory_count, 2);
    assert_eq!(summary.content_summary.file_count, 1);
    assert_eq!(summary.content_summary.length, 5);

    let err = client.delete_file_dir("data", false).await.unwrap_err();
    assert!(matches!(err.as_remote(), Some(WebHdfsError::Generic { status: 403, .. })));
    assert!(client.delete_file_dir("data", true).await.unwrap());
    assert!(!client.exists_file_dir("data").await.unwrap());
}

#[tokio::test]
async fn rename_with_relative_destination() {
    let client = WebHdfsClient::new(start(false).await).unwrap();
    client.create_file("a/f", "x", &CreateOptions::default()).await.unwrap();

    let moved = client.rename_file_dir("a/f", "b").await;
    // parent of "/b" is the root, so the move succeeds
    assert_eq!(moved.unwrap(), json!({"boolean": true}));
    assert!(client.exists_file_dir("/b").await.unwrap());
    assert!(!client.exists_file_dir("/a/f").await.unwrap());
}

#[tokio::test]
async fn metadata_updates_are_visible_in_status() {
    let client = WebHdfsClient::new(start(false).await).unwrap();
    client.create_file("f", "x", &CreateOptions::default()).await.unwrap();

    client.set_permission("f", "600").await.unwrap();
    client.set_owner("f", Some("bob"), Some("staff")).await.unwrap();
    assert_eq!(client.set_replication("f", 1).await.unwrap(), json!({"boolean": true}));

    let status: FileStatusResponse =
        serde_json::from_value(client.get_file_dir_status("f").await.unwrap()).unwrap();
    assert_eq!(status.file_status.permission, "600");
    assert_eq!(status.file_status.owner, "bob");
    assert_eq!(status.file_status.group, "staff");
    assert_eq!(status.file_status.replication, 1);

    let err = client.set_permission("f", "999").await.unwrap_err();
    assert!(matches!(err.as_remote(), Some(WebHdfsError::BadRequest { .. })));
}

#[tokio::test]
async fn extended_attributes_lifecycle() {
    let client = WebHdfsClient::new(start(false).await).unwrap();
    client.make_dir("d", None).await.unwrap();

    client.set_xattr("d", "user.color", "red", false).await.unwrap();
    let err = client.set_xattr("d", "user.color", "blue", false).await.unwrap_err();
    assert!(matches!(err.as_remote(), Some(WebHdfsError::Generic { status: 403, .. })));
    client.set_xattr("d", "user.color", "blue", true).await.unwrap();

    let attrs = client
        .get_xattr("d", Some("user.color"), XAttrEncoding::Text)
        .await
        .unwrap();
    assert_eq!(attrs, json!({"XAttrs": [{"name": "user.color", "value": "blue"}]}));
    assert_eq!(
        client.list_xattrs("d").await.unwrap(),
        json!({"XAttrNames": "[\"user.color\"]"})
    );

    client.delete_xattr("d", "user.color").await.unwrap();
    let all = client.get_xattr("d", None, XAttrEncoding::Text).await.unwrap();
    assert_eq!(all, json!({"XAttrs": []}));
}

#[tokio::test]
async fn home_directory_follows_user_name() {
    let client = WebHdfsClient::new(start(false).await.with_user("carol")).unwrap();
    assert_eq!(client.get_home_directory().await.unwrap(), json!({"Path": "/user/carol"}));
}

#[tokio::test]
async fn missing_identity_is_unauthorized() {
    let config = start(true).await;
    let anonymous = WebHdfsClient::new(config.clone()).unwrap();
    let err = anonymous.list_dir("/").await.unwrap_err();
    assert!(matches!(err.as_remote(), Some(WebHdfsError::Unauthorized { status: 401, .. })));

    let named = WebHdfsClient::new(config.with_user("dave")).unwrap();
    assert!(named.list_dir("/").await.is_ok());
}

#[tokio::test]
async fn checksum_is_stable_for_identical_content() {
    let client = WebHdfsClient::new(start(false).await).unwrap();
    client.create_file("a", "same", &CreateOptions::default()).await.unwrap();
    client.create_file("b", "same", &CreateOptions::default()).await.unwrap();

    let a = client.get_file_checksum("a").await.unwrap();
    let b = client.get_file_checksum("b").await.unwrap();
    assert_eq!(a, b);
    assert!(a["FileChecksum"]["algorithm"].is_string());
}

#[tokio::test]
async fn streaming_reassembles_the_file() {
    let client = WebHdfsClient::new(start(false).await).unwrap();
    let data: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
    client
        .create_file("big.bin", data.clone(), &CreateOptions::default())
        .await
        .unwrap();

    let chunks: Vec<_> = client.stream_file("big.bin", 4096).try_collect().await.unwrap();
    assert_eq!(chunks.len(), 3);
    let joined: Vec<u8> = chunks.iter().flat_map(|c| c.iter().copied()).collect();
    assert_eq!(joined, data);
}

#[tokio::test]
async fn unreachable_namenode_exhausts_retries() {
    // bind then drop to get a port with nothing listening
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = ClientConfig::new("127.0.0.1", port)
        .with_max_tries(2)
        .with_timeout(Duration::from_secs(2));
    let client = WebHdfsClient::new(config).unwrap();
    let err = client.list_dir("/").await.unwrap_err();
    assert!(matches!(
        err,
        webhdfs_client::ClientError::Transport(webhdfs_client::TransportError::Connect(_))
    ));
}

#[tokio::test]
async fn sub_second_timeout_still_allows_calls() {
    let config = start(false).await.with_timeout(Duration::from_millis(500));
    assert_eq!(config.timeout(), Some(Duration::from_millis(500)));
    let client = WebHdfsClient::new(config).unwrap();

    assert!(client.make_dir("d", None).await.unwrap());
    assert!(client.exists_file_dir("d").await.unwrap());
}

#[tokio::test]
async fn one_client_serves_concurrent_tasks() {
    let client = Arc::new(WebHdfsClient::new(start(false).await).unwrap());

    let mut tasks = Vec::new();
    for i in 0..8 {
        let client = Arc::clone(&client);
        tasks.push(tokio::spawn(async move {
            let path = format!("shared/f{}", i);
            client
                .create_file(&path, format!("payload {}", i), &CreateOptions::default())
                .await?;
            client.read_file(&path, &ReadOptions::default()).await
        }));
    }
    for (i, task) in tasks.into_iter().enumerate() {
        let content = task.await.unwrap().unwrap();
        assert_eq!(content, format!("payload {}", i).as_bytes());
    }

    let listing: ListStatusResponse = serde_json::from_value(client.list_dir("shared").await.unwrap()).unwrap();
    assert_eq!(listing.file_statuses.file_status.len(), 8);
}
