//! Image download adapter against a stub HTTP server.

mod common;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

use scripted_core::tools::ImageDownloader;
use scripted_core::PipelineError;

#[tokio::test]
async fn test_download_writes_response_body() {
    let app = Router::new().route("/generated/img.png", get(|| async { common::png_bytes() }));
    let base = common::serve(app).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("header.png");
    let downloader = ImageDownloader::new(common::client(), &path);

    let written = downloader
        .download(&format!("{base}/generated/img.png"))
        .await
        .unwrap();

    assert_eq!(written, path);
    assert_eq!(std::fs::read(&path).unwrap(), common::png_bytes());
}

#[tokio::test]
async fn test_download_overwrites_existing_file() {
    let app = Router::new().route("/img.png", get(|| async { "new image" }));
    let base = common::serve(app).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("header.png");
    std::fs::write(&path, b"a much longer previous image body").unwrap();

    ImageDownloader::new(common::client(), &path)
        .download(&format!("{base}/img.png"))
        .await
        .unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), b"new image");
}

#[tokio::test]
async fn test_non_success_status_raises_without_writing() {
    let app = Router::new().route(
        "/expired.png",
        get(|| async { (StatusCode::FORBIDDEN, "signature expired") }),
    );
    let base = common::serve(app).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("header.png");
    let err = ImageDownloader::new(common::client(), &path)
        .download(&format!("{base}/expired.png"))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Network(_)));
    assert!(err.to_string().contains("403"));
    assert!(!path.exists());
}

#[tokio::test]
async fn test_unreachable_url_raises_without_writing() {
    let base = common::unreachable_url().await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("header.png");
    let err = ImageDownloader::new(common::client(), &path)
        .download(&format!("{base}/img.png"))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Network(_)));
    assert!(!path.exists());
}
