//! HTTP behavior of the dev server against a real bound socket.

use fob_play::build::BuildArtifact;
use fob_play::server::{DevServer, ServerHandle};
use reqwest::StatusCode;
use tempfile::TempDir;

async fn start(artifact: BuildArtifact, root: &TempDir) -> ServerHandle {
    DevServer::new(artifact, root.path()).start(0).await.unwrap()
}

fn artifact() -> BuildArtifact {
    let mut artifact = BuildArtifact::new();
    artifact.insert("/tests.html", "<!doctype html><title>fob-play</title>");
    artifact.insert("tests.js", "console.log('bundled');");
    artifact
}

#[tokio::test]
async fn serves_artifact_with_validation_headers() {
    let root = TempDir::new().unwrap();
    let server = start(artifact(), &root).await;
    let client = reqwest::Client::new();

    let response = client.get(server.url("/tests.js")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers().clone();
    assert_eq!(
        headers["content-type"],
        "application/javascript; charset=utf-8"
    );
    assert_eq!(headers["cache-control"], "no-cache");
    let etag = headers["etag"].to_str().unwrap().to_string();
    assert!(etag.starts_with('"') && etag.ends_with('"'));
    assert_eq!(response.text().await.unwrap(), "console.log('bundled');");

    let revalidated = client
        .get(server.url("/tests.js"))
        .header("if-none-match", &etag)
        .send()
        .await
        .unwrap();
    assert_eq!(revalidated.status(), StatusCode::NOT_MODIFIED);

    server.close().await.unwrap();
}

#[tokio::test]
async fn favicon_is_an_empty_success() {
    let root = TempDir::new().unwrap();
    let server = start(artifact(), &root).await;

    let response = reqwest::get(server.url("/favicon.ico")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.bytes().await.unwrap().is_empty());

    server.close().await.unwrap();
}

#[tokio::test]
async fn nested_favicon_is_an_empty_success() {
    let root = TempDir::new().unwrap();
    let server = start(artifact(), &root).await;

    for path in ["/nested/favicon.ico", "/assets/img/favicon.ico"] {
        let response = reqwest::get(server.url(path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{path}");
        assert_eq!(response.headers()["content-type"], "image/x-icon");
        assert!(response.bytes().await.unwrap().is_empty());
    }

    server.close().await.unwrap();
}

#[tokio::test]
async fn falls_back_to_static_root() {
    let root = TempDir::new().unwrap();
    std::fs::create_dir(root.path().join("fixtures")).unwrap();
    std::fs::write(root.path().join("fixtures/data.json"), r#"{"ok":true}"#).unwrap();
    std::fs::write(root.path().join("tests.js"), "stale on disk").unwrap();
    let server = start(artifact(), &root).await;

    let fixture = reqwest::get(server.url("/fixtures/data.json")).await.unwrap();
    assert_eq!(fixture.status(), StatusCode::OK);
    assert_eq!(fixture.text().await.unwrap(), r#"{"ok":true}"#);

    let bundled = reqwest::get(server.url("/tests.js")).await.unwrap();
    assert_eq!(bundled.text().await.unwrap(), "console.log('bundled');");

    let missing = reqwest::get(server.url("/nope.js")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    server.close().await.unwrap();
}

#[tokio::test]
async fn artifact_static_root_wins_over_default() {
    let default_root = TempDir::new().unwrap();
    let context = TempDir::new().unwrap();
    std::fs::write(context.path().join("asset.txt"), "from context").unwrap();

    let artifact = BuildArtifact::new().with_static_root(context.path());
    let server = start(artifact, &default_root).await;

    let response = reqwest::get(server.url("/asset.txt")).await.unwrap();
    assert_eq!(response.text().await.unwrap(), "from context");

    server.close().await.unwrap();
}

#[tokio::test]
async fn preferred_port_taken_still_serves() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let taken = occupied.local_addr().unwrap().port();

    let root = TempDir::new().unwrap();
    let server = DevServer::new(artifact(), root.path())
        .start(taken)
        .await
        .unwrap();
    assert_ne!(server.port(), taken);

    let response = reqwest::get(server.url("/tests.html")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/html; charset=utf-8");

    server.close().await.unwrap();
}
