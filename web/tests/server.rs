//! Tests of a pipeline served over a real socket.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use boilerplate_web::autoclose::is_registered;
use boilerplate_web::{app_start, create_pipeline, PipelineSettings, Route, RouteHandler, StartOptions};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

async fn fetch(port: u16, path: &str) -> String {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn test_serves_until_closed() {
    let settings = PipelineSettings::default()
        .with_route(Route::new("/hello", RouteHandler::handler(|| async { "hello" })));
    let app = create_pipeline(settings, None).unwrap();

    let stopped = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stopped);
    let server = app_start(
        app,
        StartOptions {
            on_shutdown: Some(Box::new(move || flag.store(true, Ordering::SeqCst))),
            ..StartOptions::default()
        },
    )
    .await
    .unwrap();
    assert_ne!(server.port, 0);
    assert!(is_registered(&server.handle));

    let response = fetch(server.port, "/hello").await;
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.ends_with("hello"));

    let response = fetch(server.port, "/nope").await;
    assert!(response.starts_with("HTTP/1.1 404"));
    assert!(response.ends_with("Cannot GET /nope"));

    let handle = server.handle.clone();
    server.close();
    server.wait().await.unwrap();
    assert!(stopped.load(Ordering::SeqCst));
    assert!(!is_registered(&handle));
}

#[tokio::test]
async fn test_port_in_use() {
    let app = create_pipeline(PipelineSettings::default(), None).unwrap();
    let first = app_start(app.clone(), StartOptions::default()).await.unwrap();
    let err = app_start(
        app,
        StartOptions {
            port: first.port,
            ..StartOptions::default()
        },
    )
    .await
    .unwrap_err();
    assert!(err.to_string().starts_with("Failed to bind 127.0.0.1:"));
    first.close();
    first.wait().await.unwrap();
}
