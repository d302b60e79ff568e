//! HTTP request as seen by middleware and argument providers.

use std::fmt;
use std::io::{self, Cursor, Read};

use bytes::Bytes;
use http::header::{self, HeaderName};
use http::{HeaderMap, Method, Uri};

use super::form::{parse_cookies, parse_urlencoded, Form, FormError};

/// Readable request body stream.
pub type BodyReader = Box<dyn Read + Send>;

static FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Largest url-encoded body [`Request::parse_form`] reads.
pub const MAX_FORM_BODY: u64 = 10 << 20;

/// Parsed query string and url-encoded body.
#[derive(Clone, Debug, Default)]
pub struct FormData {
    /// Values from the query string.
    pub query: Form,
    /// Values from a url-encoded request body.
    pub post: Form,
}

/// HTTP request with a streaming body.
///
/// Clone is not derived: the body can be consumed only once. Use
/// [`Request::detach`] to hand a copy to a handler.
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    version: http::Version,
    body: BodyReader,
    url_params: Vec<(String, String)>,
    form: Option<FormData>,
}

impl Request {
    /// Create a request from its parts.
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: BodyReader) -> Self {
        Self {
            method,
            uri,
            headers,
            version: http::Version::HTTP_11,
            body,
            url_params: Vec::new(),
            form: None,
        }
    }

    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[inline]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    #[inline]
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    #[inline]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    #[inline]
    pub fn version(&self) -> http::Version {
        self.version
    }

    #[inline]
    pub fn set_version(&mut self, version: http::Version) {
        self.version = version;
    }

    /// Header value by name (case-insensitive). Non-UTF-8 values read as absent.
    #[inline]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[inline]
    fn header_by_name(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[inline]
    pub fn content_type(&self) -> Option<&str> {
        self.header_by_name(&header::CONTENT_TYPE)
    }

    #[inline]
    pub fn user_agent(&self) -> Option<&str> {
        self.header_by_name(&header::USER_AGENT)
    }

    /// Cookie value by name, searching every `Cookie` header.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(parse_cookies)
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Path parameter captured by the router.
    pub fn url_param(&self, name: &str) -> Option<&str> {
        self.url_params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// All captured path parameters.
    pub fn url_params(&self) -> &[(String, String)] {
        &self.url_params
    }

    pub(crate) fn set_url_params(&mut self, params: Vec<(String, String)>) {
        self.url_params = params;
    }

    /// Parse query string and url-encoded body. Idempotent.
    ///
    /// The body is consumed only for POST, PUT and PATCH requests with a
    /// `application/x-www-form-urlencoded` content type.
    pub fn parse_form(&mut self) -> Result<&FormData, FormError> {
        if self.form.is_none() {
            let query = parse_urlencoded(self.query().unwrap_or(""))?;
            let post = if self.has_form_body() {
                let raw = read_form_body(self.take_body(), MAX_FORM_BODY)?;
                parse_urlencoded(&raw)?
            } else {
                Form::default()
            };
            self.form = Some(FormData { query, post });
        }
        Ok(self.form.get_or_insert_with(FormData::default))
    }

    /// Form value, body values taking precedence over query values.
    pub fn form_value(&mut self, name: &str) -> Result<Option<String>, FormError> {
        let form = self.parse_form()?;
        Ok(form
            .post
            .get(name)
            .or_else(|| form.query.get(name))
            .map(str::to_owned))
    }

    /// Form value from the request body only.
    pub fn post_form_value(&mut self, name: &str) -> Result<Option<String>, FormError> {
        let form = self.parse_form()?;
        Ok(form.post.get(name).map(str::to_owned))
    }

    /// Parsed form, if [`Request::parse_form`] has already run.
    pub fn form(&self) -> Option<&FormData> {
        self.form.as_ref()
    }

    fn has_form_body(&self) -> bool {
        matches!(self.method, Method::POST | Method::PUT | Method::PATCH)
            && self
                .content_type()
                .and_then(|ct| ct.split(';').next())
                .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(FORM_URLENCODED))
    }

    /// Take the body stream, leaving an empty one behind.
    pub fn take_body(&mut self) -> BodyReader {
        std::mem::replace(&mut self.body, Box::new(io::empty()))
    }

    /// Move the body and a copy of everything else into a new request.
    pub fn detach(&mut self) -> Request {
        Request {
            method: self.method.clone(),
            uri: self.uri.clone(),
            headers: self.headers.clone(),
            version: self.version,
            body: self.take_body(),
            url_params: self.url_params.clone(),
            form: self.form.clone(),
        }
    }
}

fn read_form_body(body: impl Read, limit: u64) -> Result<String, FormError> {
    let mut raw = String::new();
    body.take(limit + 1).read_to_string(&mut raw)?;
    if raw.len() as u64 > limit {
        return Err(FormError::TooLarge(limit));
    }
    Ok(raw)
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("version", &self.version)
            .field("headers", &self.headers)
            .field("url_params", &self.url_params)
            .finish_non_exhaustive()
    }
}

impl<B> From<http::Request<B>> for Request
where
    B: Into<Bytes>,
{
    /// Buffered conversion, used by tests and in-process callers.
    fn from(req: http::Request<B>) -> Self {
        let (parts, body) = req.into_parts();
        let body: Bytes = body.into();
        let mut req = Request::new(parts.method, parts.uri, parts.headers, Box::new(Cursor::new(body)));
        req.set_version(parts.version);
        req
    }
}
