//! Access logging middleware.
//!
//! Emits one `info` event with target `"access"` per request, which the
//! JSON formatter renders as an access log line.

use crate::core::{Context, Request, Response};

use super::{Middleware, MiddlewareResult};

const QUERY_KEY: &str = "access_log.query";
const UA_KEY: &str = "access_log.ua";
const XFF_KEY: &str = "access_log.xff";

/// Access logging middleware.
#[derive(Clone, Debug)]
pub struct AccessLogMiddleware {
    enabled: bool,
}

impl AccessLogMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with enabled/disabled state.
    pub fn with_enabled(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for AccessLogMiddleware {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Middleware for AccessLogMiddleware {
    fn name(&self) -> &'static str {
        "access_log"
    }

    fn priority(&self) -> i32 {
        -90 // first in, last out
    }

    fn on_request(&self, req: Request, ctx: &mut Context) -> MiddlewareResult {
        if !self.enabled {
            return MiddlewareResult::Next(req);
        }

        if let Some(query) = req.query() {
            ctx.set(QUERY_KEY, query.to_string());
        }
        if let Some(ua) = req.user_agent() {
            ctx.set(UA_KEY, ua.to_string());
        }
        if let Some(xff) = req.header("x-forwarded-for") {
            ctx.set(XFF_KEY, xff.to_string());
        }

        MiddlewareResult::Next(req)
    }

    fn on_response(&self, res: Response, ctx: &Context) -> Response {
        if !self.enabled {
            return res;
        }

        let query = ctx.get::<String>(QUERY_KEY).map(String::as_str);
        let ua = ctx.get::<String>(UA_KEY).map(String::as_str);
        let xff = ctx.get::<String>(XFF_KEY).map(String::as_str);
        let ip = ctx.client_addr.map(|a| a.ip().to_string());

        tracing::info!(
            target: "access",
            method = %ctx.method,
            path = ctx.path.as_str(),
            query = query,
            status = res.status().as_u16(),
            bytes = res.body_len() as u64,
            duration_ms = ctx.elapsed_ms(),
            ip = ip.as_deref(),
            ua = ua,
            xff = xff,
            request_id = ctx.request_id.as_str(),
            "{} {} {}",
            ctx.method,
            ctx.path,
            res.status().as_u16()
        );

        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn request() -> Request {
        let req = http::Request::builder()
            .uri("/test?foo=bar")
            .header("user-agent", "test/1.0")
            .body(Bytes::new())
            .unwrap();
        Request::from(req)
    }

    #[test]
    fn test_stores_request_info() {
        let mw = AccessLogMiddleware::new();
        let req = request();
        let mut ctx = Context::for_request(&req, None);

        assert!(mw.on_request(req, &mut ctx).is_next());

        assert_eq!(ctx.get::<String>(QUERY_KEY).map(String::as_str), Some("foo=bar"));
        assert_eq!(ctx.get::<String>(UA_KEY).map(String::as_str), Some("test/1.0"));
        assert!(ctx.get::<String>(XFF_KEY).is_none());
    }

    #[test]
    fn test_disabled_passes_through() {
        let mw = AccessLogMiddleware::with_enabled(false);
        let req = request();
        let mut ctx = Context::for_request(&req, None);

        assert!(mw.on_request(req, &mut ctx).is_next());
        assert!(ctx.get::<String>(QUERY_KEY).is_none());

        let res = mw.on_response(Response::ok("test"), &ctx);
        assert_eq!(res.status(), http::StatusCode::OK);
    }
}
