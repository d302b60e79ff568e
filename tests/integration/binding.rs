//! Argument binding over HTTP: headers, cookies, query, form and bodies.

use crate::helpers::*;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use smartapi::{
    as_int, body_reader, cookie, header, json_body, post_query_param, query_param,
    request_struct, required_cookie, required_header, string_body, url_param, ApiError,
    BoxError, Field, Json, RequestStruct, Routes,
};
use std::io::Read;

/// Test optional and required headers
#[tokio::test]
async fn test_headers() {
    let server = TestServer::start(|s| {
        s.get(
            "/echo",
            |a: String, b: String| -> Result<String, BoxError> { Ok(format!("{a}|{b}")) },
            [header("X-Opt"), required_header("X-Req")],
        );
    })
    .await;

    let resp = server.get_with_headers("/echo", &[("X-Req", "r")]).await;
    assert_status(&resp, StatusCode::OK);
    assert_body(resp, "|r").await;

    let resp = server
        .get_with_headers("/echo", &[("X-Opt", "o"), ("X-Req", "r")])
        .await;
    assert_body(resp, "o|r").await;

    let resp = server.get("/echo").await;
    assert_error(resp, StatusCode::BAD_REQUEST, "missing required header X-Req").await;

    let resp = server.get_with_headers("/echo", &[("X-Req", "")]).await;
    assert_error(resp, StatusCode::BAD_REQUEST, "missing required header X-Req").await;
}

/// Test optional and required cookies
#[tokio::test]
async fn test_cookies() {
    let server = TestServer::start(|s| {
        s.get(
            "/session",
            |theme: String, session: String| -> Result<String, BoxError> {
                Ok(format!("{session}:{theme}"))
            },
            [cookie("theme"), required_cookie("session")],
        );
    })
    .await;

    let resp = server
        .get_with_headers("/session", &[("Cookie", "session=abc; theme=dark")])
        .await;
    assert_body(resp, "abc:dark").await;

    let resp = server
        .get_with_headers("/session", &[("Cookie", "theme=dark")])
        .await;
    assert_error(resp, StatusCode::BAD_REQUEST, "missing required cookie session").await;
}

/// Test query params with integer conversion
#[tokio::test]
async fn test_query_params_as_int() {
    let server = TestServer::start(|s| {
        s.get(
            "/sum",
            |a: i64, b: i64| -> Result<String, BoxError> { Ok((a + b).to_string()) },
            [as_int(query_param("a")), as_int(query_param("b"))],
        );
    })
    .await;

    assert_body(server.get("/sum?a=2&b=40").await, "42").await;

    let resp = server.get("/sum?a=2&b=x").await;
    assert_error(resp, StatusCode::BAD_REQUEST, "integer parse error").await;
}

/// Test form values posted in the body
#[tokio::test]
async fn test_post_form() {
    let server = TestServer::start(|s| {
        s.post(
            "/login",
            |user: String, query: String| -> Result<String, BoxError> {
                Ok(format!("{user}:{query}"))
            },
            [post_query_param("user"), query_param("next")],
        );
    })
    .await;

    let resp = server
        .post_form("/login?next=home", &[("user", "ann")])
        .await;
    assert_status(&resp, StatusCode::OK);
    assert_body(resp, "ann:home").await;
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct Note {
    title: String,
    body: String,
}

/// Test JSON request and response bodies
#[tokio::test]
async fn test_json_body() {
    let server = TestServer::start(|s| {
        s.post(
            "/notes",
            |note: Box<Note>| -> Result<Json<Note>, ApiError> {
                Ok(Json(Note {
                    title: note.title.to_uppercase(),
                    body: note.body,
                }))
            },
            [json_body::<Note>()],
        );
    })
    .await;

    let resp = server
        .post_json(
            "/notes",
            &Note {
                title: "todo".into(),
                body: "milk".into(),
            },
        )
        .await;
    assert_status(&resp, StatusCode::OK);
    assert_header(&resp, "content-type", "application/json");
    assert_body(resp, "{\"title\":\"TODO\",\"body\":\"milk\"}\n").await;

    let resp = server.post_body("/notes", "{not json").await;
    assert_error(resp, StatusCode::BAD_REQUEST, "cannot unmarshal request").await;
}

/// Test text and streamed bodies
#[tokio::test]
async fn test_raw_bodies() {
    let server = TestServer::start(|s| {
        s.post(
            "/text",
            |text: String| -> Result<String, BoxError> { Ok(text.chars().rev().collect()) },
            [string_body()],
        )
        .post(
            "/count",
            |mut body: Box<dyn Read + Send>| -> Result<String, BoxError> {
                let mut buf = Vec::new();
                body.read_to_end(&mut buf)?;
                Ok(buf.len().to_string())
            },
            [body_reader()],
        );
    })
    .await;

    assert_body(server.post_body("/text", "abc").await, "cba").await;
    assert_body(server.post_body("/count", "0123456789").await, "10").await;
}

#[derive(Default)]
struct Lookup {
    token: String,
    id: i64,
    verbose: String,
}

impl RequestStruct for Lookup {
    fn fields() -> Vec<Field<Self>> {
        vec![
            Field::new("token", "r_header=X-Token", |s: &mut Self, v| s.token = v),
            Field::new("id", "as_int=url_param=id", |s: &mut Self, v| s.id = v),
            Field::new("verbose", "query_param=verbose", |s: &mut Self, v| s.verbose = v),
        ]
    }
}

/// Test a request struct filled from tagged fields
#[tokio::test]
async fn test_request_struct() {
    let server = TestServer::start(|s| {
        s.get(
            "/items/{id}",
            |req: Box<Lookup>| -> Result<String, BoxError> {
                Ok(format!("{} {} {}", req.token, req.id, req.verbose))
            },
            [request_struct::<Lookup>()],
        );
    })
    .await;

    let resp = server
        .get_with_headers("/items/12?verbose=yes", &[("X-Token", "t")])
        .await;
    assert_body(resp, "t 12 yes").await;

    let resp = server.get("/items/12").await;
    assert_error(resp, StatusCode::BAD_REQUEST, "missing required header X-Token").await;
}

/// Test URL params are percent-decoded
#[tokio::test]
async fn test_url_param_decoding() {
    let server = TestServer::start(|s| {
        s.get(
            "/files/{name}",
            |name: String| -> Result<String, BoxError> { Ok(name) },
            [url_param("name")],
        );
    })
    .await;

    assert_body(server.get("/files/hello%20world").await, "hello world").await;
}
