//! String-valued request sources and request/response capabilities.

use std::sync::Arc;

use http::StatusCode;

use super::{ArgFlags, ArgType, Argument, Exchange, Param, ParamError, Value};
use crate::core::{ApiError, BoxError, Context, Cookies, Headers, Request, ResponseWriter};
use crate::middleware::Middleware;

/// Where a string argument comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Source {
    Header,
    Cookie,
    Query,
    PostQuery,
    UrlParam,
}

impl Source {
    fn label(&self) -> &'static str {
        match self {
            Source::Header => "header",
            Source::Cookie => "cookie",
            Source::Query => "query param",
            Source::PostQuery => "post query param",
            Source::UrlParam => "url param",
        }
    }
}

/// A named string value. Optional sources yield `""` when absent; required
/// ones reject absent or empty values with a 400.
#[derive(Debug)]
pub(crate) struct StringArg {
    source: Source,
    name: String,
    required: bool,
}

impl StringArg {
    fn param(source: Source, name: &str, required: bool) -> Param {
        Param::argument(StringArg {
            source,
            name: name.to_string(),
            required,
        })
    }

    fn lookup(&self, req: &mut Request) -> Result<Option<String>, ApiError> {
        let value = match self.source {
            Source::Header => req.header(&self.name).map(str::to_owned),
            Source::Cookie => req.cookie(&self.name),
            Source::Query => req.form_value(&self.name).map_err(form_error)?,
            Source::PostQuery => req.post_form_value(&self.name).map_err(form_error)?,
            Source::UrlParam => req.url_param(&self.name).map(str::to_owned),
        };
        Ok(value)
    }
}

/// 400 "could not parse form".
pub(crate) fn form_error(err: crate::core::FormError) -> ApiError {
    ApiError::wrap(StatusCode::BAD_REQUEST, err, "could not parse form")
}

impl Argument for StringArg {
    fn flags(&self) -> ArgFlags {
        match self.source {
            Source::Query | Source::PostQuery => ArgFlags::PARSES_QUERY,
            _ => ArgFlags::NONE,
        }
    }

    fn check(&self, ty: ArgType) -> Result<(), ParamError> {
        if ty.is::<String>() {
            Ok(())
        } else {
            Err(ParamError::ExpectedString(ty.name()))
        }
    }

    fn extract(&self, ex: &mut Exchange<'_>) -> Result<Value, BoxError> {
        let value = self.lookup(ex.request)?.unwrap_or_default();
        if self.required && value.is_empty() {
            return Err(ApiError::bad_request(format!(
                "missing required {} {}",
                self.source.label(),
                self.name
            ))
            .into());
        }
        Ok(Box::new(value))
    }
}

/// Request header value, `""` when absent.
pub fn header(name: &str) -> Param {
    StringArg::param(Source::Header, name, false)
}

/// Request header value; 400 `missing required header <name>` when absent or empty.
pub fn required_header(name: &str) -> Param {
    StringArg::param(Source::Header, name, true)
}

/// Request cookie value, `""` when absent.
pub fn cookie(name: &str) -> Param {
    StringArg::param(Source::Cookie, name, false)
}

/// Request cookie value; 400 `missing required cookie <name>` when absent or empty.
pub fn required_cookie(name: &str) -> Param {
    StringArg::param(Source::Cookie, name, true)
}

/// Form value (url-encoded body first, then query string), `""` when absent.
pub fn query_param(name: &str) -> Param {
    StringArg::param(Source::Query, name, false)
}

/// Like [`query_param`]; 400 `missing required query param <name>` when absent or empty.
pub fn required_query_param(name: &str) -> Param {
    StringArg::param(Source::Query, name, true)
}

/// Value from the url-encoded body only, `""` when absent.
pub fn post_query_param(name: &str) -> Param {
    StringArg::param(Source::PostQuery, name, false)
}

/// Like [`post_query_param`]; 400 `missing required post query param <name>`.
pub fn required_post_query_param(name: &str) -> Param {
    StringArg::param(Source::PostQuery, name, true)
}

/// Path parameter captured by the route pattern, `""` when absent.
pub fn url_param(name: &str) -> Param {
    StringArg::param(Source::UrlParam, name, false)
}

/// The kinds of request/response objects a handler can ask for directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Capability {
    Context,
    ResponseWriter,
    Request,
    ResponseHeaders,
    ResponseCookies,
}

#[derive(Debug)]
struct CapabilityArg(Capability);

impl Argument for CapabilityArg {
    fn flags(&self) -> ArgFlags {
        match self.0 {
            Capability::ResponseWriter => ArgFlags::WRITES_RESPONSE,
            Capability::Request => ArgFlags::READS_BODY,
            _ => ArgFlags::NONE,
        }
    }

    fn check(&self, ty: ArgType) -> Result<(), ParamError> {
        match self.0 {
            Capability::Context => ty.expect::<Context>(),
            Capability::ResponseWriter => ty.expect::<ResponseWriter>(),
            Capability::Request => ty.expect::<Request>(),
            Capability::ResponseHeaders => ty.expect::<Headers>(),
            Capability::ResponseCookies => ty.expect::<Cookies>(),
        }
    }

    fn extract(&self, ex: &mut Exchange<'_>) -> Result<Value, BoxError> {
        let value: Value = match self.0 {
            Capability::Context => Box::new(ex.context.clone()),
            Capability::ResponseWriter => Box::new(ex.response.clone()),
            Capability::Request => Box::new(ex.request.detach()),
            Capability::ResponseHeaders => Box::new(ex.response.headers()),
            Capability::ResponseCookies => Box::new(ex.response.cookies()),
        };
        Ok(value)
    }
}

/// The request [`Context`], including values set by middleware.
pub fn context() -> Param {
    Param::argument(CapabilityArg(Capability::Context))
}

/// Direct access to the response. The handler may then not return a body.
pub fn response_writer() -> Param {
    Param::argument(CapabilityArg(Capability::ResponseWriter))
}

/// The request itself, body included. Counts as a body reader.
pub fn request() -> Param {
    Param::argument(CapabilityArg(Capability::Request))
}

/// Response header sink.
pub fn response_headers() -> Param {
    Param::argument(CapabilityArg(Capability::ResponseHeaders))
}

/// Response cookie sink.
pub fn response_cookies() -> Param {
    Param::argument(CapabilityArg(Capability::ResponseCookies))
}

/// Success status code for the endpoint.
pub fn response_status(status: StatusCode) -> Param {
    Param::Status(status)
}

/// Wrap the endpoint (or every endpoint of a route) in a middleware.
pub fn middleware<M: Middleware + 'static>(m: M) -> Param {
    Param::Middleware(Arc::new(m))
}
