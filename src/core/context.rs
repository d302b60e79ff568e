//! Per-request context shared by middleware and handlers.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::header::HeaderName;
use http::Method;

use super::Request;

static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Request-scoped data.
///
/// Middleware mutate the context before the handler runs; a handler that
/// declares a `context()` argument receives a clone with everything the
/// middleware stored.
#[derive(Clone)]
pub struct Context {
    /// Request ID for log correlation (from `X-Request-ID` or generated).
    pub request_id: String,

    /// Peer address, when served over a socket.
    pub client_addr: Option<SocketAddr>,

    /// Request method.
    pub method: Method,

    /// Request path.
    pub path: String,

    /// Request start time.
    pub started_at: Instant,

    values: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl Context {
    /// Create an empty context with a fresh request ID.
    pub fn new() -> Self {
        Self {
            request_id: generate_request_id(),
            client_addr: None,
            method: Method::GET,
            path: String::from("/"),
            started_at: Instant::now(),
            values: HashMap::new(),
        }
    }

    /// Build the context for an incoming request.
    pub fn for_request(req: &Request, client_addr: Option<SocketAddr>) -> Self {
        let request_id = req
            .headers()
            .get(&X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(generate_request_id);

        Self {
            request_id,
            client_addr,
            method: req.method().clone(),
            path: req.path().to_string(),
            started_at: Instant::now(),
            values: HashMap::new(),
        }
    }

    /// Store a value under `key`, replacing any previous one.
    #[inline]
    pub fn set<T: Send + Sync + 'static>(&mut self, key: &str, value: T) {
        self.values.insert(key.to_string(), Arc::new(value));
    }

    /// Get a value if present and of type `T`.
    #[inline]
    pub fn get<T: 'static>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| v.downcast_ref())
    }

    /// Remove a value.
    #[inline]
    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    #[inline]
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.values.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("Context")
            .field("request_id", &self.request_id)
            .field("client_addr", &self.client_addr)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("values", &keys)
            .finish()
    }
}

/// 16 hex chars, enough to correlate log lines.
fn generate_request_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(16);
    id
}
