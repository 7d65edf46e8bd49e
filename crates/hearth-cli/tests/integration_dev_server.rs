//! Integration tests for the dev server, live reload and the rebuild loop.
//!
//! Requests go straight through the router with `oneshot`; no sockets.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use hearth_bundler::{
    ArtifactBuilder, BuildOptions, BuildRequest, BuildResult, Diagnostic, Engine, OutputFile,
};
use hearth_cli::dev::watcher::DEFAULT_DEBOUNCE;
use hearth_cli::dev::{
    FileWatcher, LiveReload, LiveReloadEvent, RebuildLoop, RebuildNotifier, ServerState, router,
};
use hearth_cli::logger::Logger;
use http_body_util::BodyExt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

fn out_dir() -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("index.html"), "<h1>app</h1>").unwrap();
    fs::write(temp.path().join("app.js"), "console.log(1);").unwrap();
    fs::create_dir_all(temp.path().join("assets")).unwrap();
    fs::write(temp.path().join("assets/app.css"), "body{}").unwrap();
    fs::write(temp.path().join("my logo.svg"), "<svg id=\"logo\"/>").unwrap();
    temp
}

async fn get(temp: &TempDir, uri: &str) -> (StatusCode, Option<String>, String) {
    let app = router(ServerState::new(temp.path(), LiveReload::new()));
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let cors = response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .map(|v| v.to_str().unwrap().to_string());
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, cors, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_serves_existing_file() {
    let temp = out_dir();
    let (status, cors, body) = get(&temp, "/app.js").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cors.as_deref(), Some("*"));
    assert_eq!(body, "console.log(1);");

    let (_, _, body) = get(&temp, "/assets/app.css").await;
    assert_eq!(body, "body{}");
}

#[tokio::test]
async fn test_percent_encoded_path_serves_file() {
    let temp = out_dir();
    let (status, cors, body) = get(&temp, "/my%20logo.svg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cors.as_deref(), Some("*"));
    assert_eq!(body, "<svg id=\"logo\"/>");

    // Decoded but still missing: the shell document.
    let (_, _, body) = get(&temp, "/other%20logo.svg").await;
    assert_eq!(body, "<h1>app</h1>");
}

#[tokio::test]
async fn test_unknown_paths_fall_back_to_index() {
    let temp = out_dir();
    for uri in ["/", "/dashboard/settings", "/assets", "/missing.js"] {
        let (status, cors, body) = get(&temp, uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(cors.as_deref(), Some("*"), "{uri}");
        assert_eq!(body, "<h1>app</h1>", "{uri}");
    }
}

#[tokio::test]
async fn test_parent_segments_cannot_escape() {
    let parent = TempDir::new().unwrap();
    fs::write(parent.path().join("secret.txt"), "secret").unwrap();
    let dist = parent.path().join("dist");
    fs::create_dir_all(&dist).unwrap();
    fs::write(dist.join("index.html"), "<h1>app</h1>").unwrap();

    let app = router(ServerState::new(&dist, LiveReload::new()));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/../secret.txt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"<h1>app</h1>");
}

#[tokio::test]
async fn test_livereload_stream_delivers_events() {
    let temp = out_dir();
    let live = LiveReload::new();
    let app = router(ServerState::new(temp.path(), live.clone()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/livereload")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
    assert_eq!(live.client_count(), 1);

    live.reload();
    let mut body = response.into_body();
    let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
    assert!(text.contains("event: reload"), "{text}");
    assert!(text.contains("data: reload"), "{text}");
}

#[tokio::test]
async fn test_closed_clients_are_dropped_on_broadcast() {
    let live = LiveReload::new();
    let (_id, rx) = live.register();
    let (_kept, mut kept_rx) = live.register();
    drop(rx);

    live.reload();
    assert_eq!(live.client_count(), 1);
    assert_eq!(kept_rx.recv().await, Some(LiveReloadEvent::Reload));
}

/// Fails every other build. Each build reports its entry as the only
/// module read.
#[derive(Default)]
struct FlakyEngine {
    builds: AtomicUsize,
}

#[async_trait]
impl Engine for FlakyEngine {
    async fn build(&self, request: BuildRequest) -> BuildResult {
        let n = self.builds.fetch_add(1, Ordering::SeqCst);
        let result = if n % 2 == 1 {
            BuildResult::failed(vec![
                Diagnostic::new("Unexpected token").at("src/app.js", Some(2), Some(4)),
            ])
        } else {
            BuildResult::success(vec![OutputFile::new(request.options.out_dir.join("app.js"))])
        };
        result.with_watch_files([request.entry])
    }
}

fn flaky_builder(engine: &Arc<FlakyEngine>, root: &Path) -> ArtifactBuilder {
    ArtifactBuilder::new(
        engine.clone(),
        Arc::new(BuildOptions::new(root, root.join("dist"))),
    )
}

#[tokio::test]
async fn test_notifier_sends_reload_then_error() {
    let live = LiveReload::new();
    let (_id, mut rx) = live.register();
    let engine = Arc::new(FlakyEngine::default());

    let mut rebuild = RebuildLoop::new(
        flaky_builder(&engine, Path::new("/p")),
        vec![PathBuf::from("/p/src/app.js")],
        Logger::silent(),
    );
    let mut notifier = RebuildNotifier::new(live.clone(), Logger::silent());

    rebuild.rebuild_all(&mut notifier).await.unwrap();
    assert_eq!(rx.recv().await, Some(LiveReloadEvent::Reload));

    rebuild.rebuild_all(&mut notifier).await.unwrap();
    assert_eq!(
        rx.recv().await,
        Some(LiveReloadEvent::Error(
            "Build Error: Unexpected token @ src/app.js".to_string()
        ))
    );
    assert!(rx.try_recv().is_err());
}

/// Always succeeds; counts builds.
#[derive(Default)]
struct CleanEngine {
    builds: AtomicUsize,
}

#[async_trait]
impl Engine for CleanEngine {
    async fn build(&self, request: BuildRequest) -> BuildResult {
        self.builds.fetch_add(1, Ordering::SeqCst);
        let stem = request.entry.file_stem().unwrap().to_string_lossy().into_owned();
        BuildResult::success(vec![OutputFile::new(
            request.options.out_dir.join(format!("{stem}.js")),
        )])
        .with_watch_files([request.entry])
    }
}

#[tokio::test]
async fn test_two_entries_one_reload_per_batch() {
    let live = LiveReload::new();
    let (_id, mut rx) = live.register();
    let engine = Arc::new(CleanEngine::default());
    let builder = ArtifactBuilder::new(
        engine.clone(),
        Arc::new(BuildOptions::new("/p", "/p/dist")),
    );

    let entries = vec![
        PathBuf::from("/p/src/app.js"),
        PathBuf::from("/p/src/admin.js"),
        PathBuf::from("/p/src/app.js"),
    ];
    let mut rebuild = RebuildLoop::new(builder, entries, Logger::silent());
    let mut notifier = RebuildNotifier::new(live.clone(), Logger::silent());

    rebuild.rebuild_all(&mut notifier).await.unwrap();

    // The repeated reference is built once; both builds finish before the
    // single reload goes out.
    assert_eq!(engine.builds.load(Ordering::SeqCst), 2);
    assert_eq!(rx.recv().await, Some(LiveReloadEvent::Reload));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_one_failing_entry_suppresses_reload() {
    let live = LiveReload::new();
    let (_id, mut rx) = live.register();
    let engine = Arc::new(FlakyEngine::default());

    // First entry builds, second fails.
    let mut rebuild = RebuildLoop::new(
        flaky_builder(&engine, Path::new("/p")),
        vec![PathBuf::from("/p/src/app.js"), PathBuf::from("/p/src/admin.js")],
        Logger::silent(),
    );
    let mut notifier = RebuildNotifier::new(live.clone(), Logger::silent());

    rebuild.rebuild_all(&mut notifier).await.unwrap();

    assert_eq!(
        rx.recv().await,
        Some(LiveReloadEvent::Error(
            "Build Error: Unexpected token @ src/app.js".to_string()
        ))
    );
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_only_module_changes_trigger_reload() {
    let project = TempDir::new().unwrap();
    let root = project.path().canonicalize().unwrap();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(root.join("src/app.js"), "export {};").unwrap();

    let live = LiveReload::new();
    let (_id, mut rx) = live.register();
    let engine = Arc::new(CleanEngine::default());
    let builder = ArtifactBuilder::new(
        engine.clone(),
        Arc::new(BuildOptions::new(&root, root.join("dist"))),
    );

    let (_watcher, changes) =
        FileWatcher::new(root.clone(), vec![PathBuf::from("dist")], DEFAULT_DEBOUNCE).unwrap();
    let cancel = CancellationToken::new();
    let task = {
        let cancel = cancel.clone();
        let live = live.clone();
        let entry = root.join("src/app.js");
        tokio::spawn(async move {
            let mut notifier = RebuildNotifier::new(live, Logger::silent());
            RebuildLoop::new(builder, vec![entry], Logger::silent())
                .run(changes, &mut notifier, cancel)
                .await
        })
    };

    // Give the watcher a moment to start before touching files.
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Files outside the module graph, like a server's log, are ignored.
    fs::write(root.join("app.log"), "listening on 3000\n").unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(engine.builds.load(Ordering::SeqCst), 0);
    assert!(rx.try_recv().is_err());

    fs::write(root.join("src/app.js"), "export const x = 1;").unwrap();
    let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .unwrap();
    assert_eq!(event, Some(LiveReloadEvent::Reload));
    assert!(engine.builds.load(Ordering::SeqCst) >= 1);

    cancel.cancel();
    task.await.unwrap().unwrap();
}
