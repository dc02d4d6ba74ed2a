//! `close_servers` stops every started server.

#![allow(clippy::unwrap_used)]

use boilerplate_web::autoclose::is_registered;
use boilerplate_web::{app_start, close_servers, create_pipeline, PipelineSettings, StartOptions};

#[tokio::test]
async fn test_close_servers_stops_everything() {
    let app = create_pipeline(PipelineSettings::default(), None).unwrap();
    let first = app_start(app.clone(), StartOptions::default()).await.unwrap();
    let second = app_start(app, StartOptions::default()).await.unwrap();
    assert!(is_registered(&first.handle));
    assert!(is_registered(&second.handle));

    close_servers();

    assert!(first.handle.is_closed());
    assert!(second.handle.is_closed());
    first.wait().await.unwrap();
    second.wait().await.unwrap();
}
