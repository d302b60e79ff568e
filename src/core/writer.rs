//! Response sinks handed to handlers.
//!
//! A [`ResponseWriter`] is a shared handle on the in-flight response. The
//! [`Headers`] and [`Cookies`] views write through to the same state, so a
//! handler can take any combination of them as arguments.

use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use bytes::{BufMut, BytesMut};
use http::header::{self, HeaderName};
use http::{HeaderMap, HeaderValue, StatusCode};

use super::Response;

#[derive(Debug, Default)]
struct ResponseState {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

/// Handle on the response being built for the current request.
///
/// The first status written wins; writing body bytes without a status
/// commits 200.
#[derive(Clone, Debug, Default)]
pub struct ResponseWriter {
    state: Arc<Mutex<ResponseState>>,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ResponseState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the status code unless one was already written.
    pub fn write_header(&self, status: StatusCode) {
        let mut state = self.lock();
        if state.status.is_none() {
            state.status = Some(status);
        }
    }

    /// Status written so far, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.lock().status
    }

    /// Append bytes to the body.
    pub fn write_body(&self, data: &[u8]) {
        let mut state = self.lock();
        state.status.get_or_insert(StatusCode::OK);
        state.body.put_slice(data);
    }

    /// Header view on this response.
    pub fn headers(&self) -> Headers {
        Headers {
            writer: self.clone(),
        }
    }

    /// Cookie view on this response.
    pub fn cookies(&self) -> Cookies {
        Cookies {
            writer: self.clone(),
        }
    }

    /// Assemble the response. A response without a written status is 200.
    pub fn finish(&self) -> Response {
        let mut state = self.lock();
        let status = state.status.unwrap_or(StatusCode::OK);
        let headers = std::mem::take(&mut state.headers);
        let body = std::mem::take(&mut state.body).freeze();
        Response::new(status, headers, body)
    }
}

impl io::Write for ResponseWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_body(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Write for &ResponseWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_body(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Response header sink.
///
/// Invalid names or values are ignored, matching [`Response::with_header`].
#[derive(Clone, Debug)]
pub struct Headers {
    writer: ResponseWriter,
}

impl Headers {
    /// Replace all values of `name`.
    pub fn set(&self, name: &str, value: &str) {
        if let Some((name, value)) = header_pair(name, value) {
            self.writer.lock().headers.insert(name, value);
        }
    }

    /// Replace all values of a typed header.
    pub(crate) fn insert(&self, name: HeaderName, value: HeaderValue) {
        self.writer.lock().headers.insert(name, value);
    }

    /// Append a value to `name`.
    pub fn add(&self, name: &str, value: &str) {
        if let Some((name, value)) = header_pair(name, value) {
            self.writer.lock().headers.append(name, value);
        }
    }

    /// First value of `name`.
    pub fn get(&self, name: &str) -> Option<String> {
        self.writer
            .lock()
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    }

    pub fn remove(&self, name: &str) {
        self.writer.lock().headers.remove(name);
    }
}

fn header_pair(name: &str, value: &str) -> Option<(HeaderName, HeaderValue)> {
    match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
        (Ok(name), Ok(value)) => Some((name, value)),
        _ => {
            tracing::debug!(header = name, "ignoring invalid response header");
            None
        }
    }
}

/// Response cookie sink. Each cookie becomes its own `Set-Cookie` header.
#[derive(Clone, Debug)]
pub struct Cookies {
    writer: ResponseWriter,
}

impl Cookies {
    pub fn add(&self, cookie: Cookie) {
        match HeaderValue::try_from(cookie.to_string()) {
            Ok(value) => {
                self.writer.lock().headers.append(header::SET_COOKIE, value);
            }
            Err(_) => tracing::debug!(cookie = %cookie.name, "ignoring invalid cookie"),
        }
    }
}

/// `SameSite` cookie attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// A `Set-Cookie` value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub expires: Option<SystemTime>,
    pub max_age: Option<i64>,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: Option<SameSite>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: None,
            domain: None,
            expires: None,
            max_age: None,
            http_only: false,
            secure: false,
            same_site: None,
        }
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn expires(mut self, at: SystemTime) -> Self {
        self.expires = Some(at);
        self
    }

    pub fn max_age(mut self, secs: i64) -> Self {
        self.max_age = Some(secs);
        self
    }

    pub fn http_only(mut self, on: bool) -> Self {
        self.http_only = on;
        self
    }

    pub fn secure(mut self, on: bool) -> Self {
        self.secure = on;
        self
    }

    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if let Some(path) = &self.path {
            write!(f, "; Path={}", path)?;
        }
        if let Some(domain) = &self.domain {
            write!(f, "; Domain={}", domain)?;
        }
        if let Some(expires) = self.expires {
            write!(f, "; Expires={}", httpdate::fmt_http_date(expires))?;
        }
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={}", max_age.max(0))?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        if let Some(same_site) = self.same_site {
            write!(f, "; SameSite={}", same_site.as_str())?;
        }
        Ok(())
    }
}
