//! Response strategies, status codes and error bodies.

use crate::helpers::*;
use reqwest::StatusCode;
use smartapi::core::Cookie;
use smartapi::{
    query_param, response_cookies, response_headers, response_status, response_writer, ApiError,
    BoxError, Routes,
};

/// Test error-only endpoints answer 204 or the error
#[tokio::test]
async fn test_error_only() {
    let server = TestServer::start(|s| {
        s.delete(
            "/items",
            |id: String| -> Result<(), ApiError> {
                if id == "locked" {
                    return Err(ApiError::new(StatusCode::CONFLICT, "item is locked", "locked"));
                }
                Ok(())
            },
            [query_param("id")],
        );
    })
    .await;

    let resp = server
        .client
        .delete(server.url("/items?id=1"))
        .send()
        .await
        .unwrap();
    assert_status(&resp, StatusCode::NO_CONTENT);

    let resp = server
        .client
        .delete(server.url("/items?id=locked"))
        .send()
        .await
        .unwrap();
    assert_error(resp, StatusCode::CONFLICT, "locked").await;
}

/// Test empty text bodies become 204
#[tokio::test]
async fn test_empty_text_is_no_content() {
    let server = TestServer::start(|s| {
        s.get(
            "/maybe",
            |q: String| -> Result<String, BoxError> { Ok(q) },
            [query_param("q")],
        );
    })
    .await;

    assert_status(&server.get("/maybe").await, StatusCode::NO_CONTENT);
    assert_body(server.get("/maybe?q=x").await, "x").await;
}

/// Test an explicit success status
#[tokio::test]
async fn test_response_status() {
    let server = TestServer::start(|s| {
        s.post(
            "/jobs",
            || -> Result<String, BoxError> { Ok("queued".into()) },
            [response_status(StatusCode::ACCEPTED)],
        )
        .put("/jobs", || -> Result<(), BoxError> { Ok(()) }, [response_status(StatusCode::CREATED)]);
    })
    .await;

    let resp = server.post_body("/jobs", "").await;
    assert_status(&resp, StatusCode::ACCEPTED);
    assert_body(resp, "queued").await;

    let resp = server.client.put(server.url("/jobs")).send().await.unwrap();
    assert_status(&resp, StatusCode::CREATED);
}

/// Test non-API errors hide their message
#[tokio::test]
async fn test_unknown_error() {
    let server = TestServer::start(|s| {
        s.get(
            "/boom",
            || -> Result<String, BoxError> { Err("database password leaked in message".into()) },
            [],
        );
    })
    .await;

    let resp = server.get("/boom").await;
    assert_error(resp, StatusCode::INTERNAL_SERVER_ERROR, "unknown").await;
}

/// Test a panicking handler answers 500
#[tokio::test]
async fn test_handler_panic() {
    let server = TestServer::start(|s| {
        s.get("/panic", || -> Result<String, BoxError> { panic!("boom") }, []);
    })
    .await;

    let resp = server.get("/panic").await;
    assert_error(resp, StatusCode::INTERNAL_SERVER_ERROR, "unknown").await;
}

/// Test response headers and cookies set by the handler
#[tokio::test]
async fn test_response_headers_and_cookies() {
    let server = TestServer::start(|s| {
        s.get(
            "/login",
            |headers: smartapi::core::Headers,
             cookies: smartapi::core::Cookies|
             -> Result<String, BoxError> {
                headers.set("X-Request-Kind", "login");
                cookies.add(Cookie::new("session", "abc").path("/"));
                cookies.add(Cookie::new("theme", "dark"));
                Ok("ok".into())
            },
            [response_headers(), response_cookies()],
        );
    })
    .await;

    let resp = server.get("/login").await;
    assert_status(&resp, StatusCode::OK);
    assert_header(&resp, "x-request-kind", "login");

    let cookies: Vec<&str> = resp
        .headers()
        .get_all("set-cookie")
        .iter()
        .map(|v| v.to_str().unwrap())
        .collect();
    assert_eq!(cookies.len(), 2);
    assert!(cookies[0].starts_with("session=abc"));
    assert!(cookies[1].starts_with("theme=dark"));
}

/// Test handlers writing the response themselves
#[tokio::test]
async fn test_response_writer() {
    let server = TestServer::start(|s| {
        s.get(
            "/teapot",
            |w: smartapi::ResponseWriter| {
                w.write_header(StatusCode::IM_A_TEAPOT);
                w.write_body(b"short and stout");
            },
            [response_writer()],
        );
    })
    .await;

    let resp = server.get("/teapot").await;
    assert_status(&resp, StatusCode::IM_A_TEAPOT);
    assert_body(resp, "short and stout").await;
}
