//! Routing: scopes, methods, 404/405, middleware and raw handlers.

use crate::helpers::*;
use http::Method;
use reqwest::StatusCode;
use smartapi::middleware::{from_fn, MiddlewareResult};
use smartapi::{context, header, required_header, BoxError, Context, Response, Routes};

/// Test nested scopes share params
#[tokio::test]
async fn test_nested_scopes() {
    let server = TestServer::start(|s| {
        s.route(
            "/v1",
            |v1| {
                v1.route(
                    "/users",
                    |users| {
                        users.get(
                            "/me",
                            |token: String, lang: String| -> Result<String, BoxError> {
                                Ok(format!("{token}/{lang}"))
                            },
                            [header("Accept-Language")],
                        );
                    },
                    [],
                );
            },
            [required_header("X-Token")],
        );
    })
    .await;

    let resp = server
        .get_with_headers("/v1/users/me", &[("X-Token", "t"), ("Accept-Language", "de")])
        .await;
    assert_status(&resp, StatusCode::OK);
    assert_body(resp, "t/de").await;

    let resp = server.get("/v1/users/me").await;
    assert_error(resp, StatusCode::BAD_REQUEST, "missing required header X-Token").await;
}

/// Test 404 and 405 responses
#[tokio::test]
async fn test_not_found_and_method_not_allowed() {
    let server = TestServer::start(|s| {
        s.get("/items", || -> Result<String, BoxError> { Ok("list".into()) }, [])
            .post("/items", || {}, []);
    })
    .await;

    let resp = server.get("/missing").await;
    assert_error(resp, StatusCode::NOT_FOUND, "not found").await;

    let resp = server
        .client
        .delete(server.url("/items"))
        .send()
        .await
        .unwrap();
    assert_header(&resp, "allow", "GET, POST");
    assert_error(resp, StatusCode::METHOD_NOT_ALLOWED, "method not allowed").await;
}

/// Test middleware can authorize and annotate requests
#[tokio::test]
async fn test_middleware() {
    let server = TestServer::start(|s| {
        s.get("/public", || -> Result<String, BoxError> { Ok("open".into()) }, []);
        s.with(from_fn("auth", |req, ctx: &mut Context| {
            if req.header("authorization") != Some("Bearer good") {
                return MiddlewareResult::Stop(Response::error(
                    StatusCode::UNAUTHORIZED,
                    "unauthorized",
                ));
            }
            ctx.set("user", "ann".to_string());
            MiddlewareResult::Next(req)
        }))
        .get(
            "/private",
            |ctx: Context| -> Result<String, BoxError> {
                Ok(ctx.get::<String>("user").cloned().unwrap_or_default())
            },
            [context()],
        );
    })
    .await;

    assert_body(server.get("/public").await, "open").await;

    let resp = server.get("/private").await;
    assert_error(resp, StatusCode::UNAUTHORIZED, "unauthorized").await;

    let resp = server
        .get_with_headers("/private", &[("Authorization", "Bearer good")])
        .await;
    assert_body(resp, "ann").await;
}

/// Test raw handlers
#[tokio::test]
async fn test_raw_handler() {
    let server = TestServer::start(|s| {
        s.raw(Method::GET, "/raw/{name}", |req, w| {
            let name = req.url_param("name").unwrap_or_default().to_string();
            w.headers().set("content-type", "text/plain");
            w.write_body(format!("raw {name}").as_bytes());
        });
    })
    .await;

    let resp = server.get("/raw/bob").await;
    assert_status(&resp, StatusCode::OK);
    assert_header(&resp, "content-type", "text/plain");
    assert_body(resp, "raw bob").await;
}
