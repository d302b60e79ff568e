//! Test helpers and utilities

use reqwest::{Client, Response, StatusCode};
use smartapi::server::ShutdownHandle;
use smartapi::Server;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// An in-process server on an ephemeral port.
pub struct TestServer {
    pub base_url: String,
    pub client: Client,
    shutdown: ShutdownHandle,
    task: Option<JoinHandle<Result<(), smartapi::ServerError>>>,
}

#[allow(dead_code)]
impl TestServer {
    /// Declare routes on a fresh server and start serving them.
    pub async fn start<F>(build: F) -> Self
    where
        F: FnOnce(&mut Server),
    {
        let mut server = Server::new();
        build(&mut server);
        server.handler().expect("API should build");

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("No local address");
        let shutdown = server.shutdown_handle();
        let task = tokio::spawn(async move { server.serve(listener).await });

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: format!("http://{}", addr),
            client,
            shutdown,
            task: Some(task),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Make a GET request to the server
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    /// Make a GET request with custom headers
    pub async fn get_with_headers(&self, path: &str, headers: &[(&str, &str)]) -> Response {
        let mut req = self.client.get(self.url(path));
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        req.send().await.expect("GET request failed")
    }

    /// Make a POST request with form data
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST request failed")
    }

    /// Make a POST request with JSON body
    pub async fn post_json<T: serde::Serialize + ?Sized>(&self, path: &str, json: &T) -> Response {
        self.client
            .post(self.url(path))
            .json(json)
            .send()
            .await
            .expect("POST request failed")
    }

    /// Make a POST request with a raw body
    pub async fn post_body(&self, path: &str, body: &'static str) -> Response {
        self.client
            .post(self.url(path))
            .body(body)
            .send()
            .await
            .expect("POST request failed")
    }

    /// Stop the server and wait for the accept loop to end.
    pub async fn stop(mut self) {
        self.shutdown.trigger();
        if let Some(task) = self.task.take() {
            tokio::time::timeout(Duration::from_secs(40), task)
                .await
                .expect("server did not stop")
                .expect("server task panicked")
                .expect("server failed");
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Assert that response has expected status
pub fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(
        response.status(),
        expected,
        "Expected status {}, got {}",
        expected,
        response.status()
    );
}

/// Assert that response contains header
pub fn assert_header(response: &Response, name: &str, expected: &str) {
    let value = response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("Header '{}' not found", name))
        .to_str()
        .unwrap();
    assert_eq!(value, expected, "Header '{}' mismatch", name);
}

/// Assert that response body equals the expected text
pub async fn assert_body(response: Response, expected: &str) {
    let body = response.text().await.expect("Failed to read body");
    assert_eq!(body, expected);
}

/// Assert that response is a JSON error with `status` and `reason`
pub async fn assert_error(response: Response, status: StatusCode, reason: &str) {
    assert_status(&response, status);
    assert_header(&response, "content-type", "application/json");
    let body: serde_json::Value = response.json().await.expect("Body is not JSON");
    assert_eq!(body["status"], status.as_u16());
    assert_eq!(body["reason"], reason);
}
