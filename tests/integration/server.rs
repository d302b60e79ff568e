//! Server lifecycle.

use crate::helpers::*;
use reqwest::StatusCode;
use smartapi::{BoxError, Routes, Server, ServerError};

/// Test shutdown stops the server
#[tokio::test]
async fn test_shutdown() {
    let server = TestServer::start(|s| {
        s.get("/ping", || -> Result<String, BoxError> { Ok("pong".into()) }, []);
    })
    .await;

    assert_body(server.get("/ping").await, "pong").await;

    let url = server.url("/ping");
    let client = server.client.clone();
    server.stop().await;

    assert!(client.get(url).send().await.is_err());
}

/// Test concurrent requests are served
#[tokio::test]
async fn test_concurrent_requests() {
    let server = TestServer::start(|s| {
        s.get(
            "/slow",
            || -> Result<String, BoxError> {
                std::thread::sleep(std::time::Duration::from_millis(100));
                Ok("done".into())
            },
            [],
        );
    })
    .await;

    let requests = (0..8).map(|_| server.client.get(server.url("/slow")).send());
    let responses = futures_util::future::join_all(requests).await;
    for resp in responses {
        assert_eq!(resp.unwrap().status(), StatusCode::OK);
    }
}

/// Test an invalid API is rejected before binding
#[tokio::test]
async fn test_invalid_api_is_rejected() {
    let mut server = Server::new();
    server.get("/a", |_n: i64| -> Result<String, BoxError> { Ok(String::new()) }, []);
    let err = server
        .start("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, ServerError::Build(_)));
    assert!(err.to_string().contains("endpoint /a"));
}
