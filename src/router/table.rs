//! Path matching and the built request handler.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use http::header::ALLOW;
use http::{Method, StatusCode};
use percent_encoding::percent_decode_str;
use tracing::{debug, error};

use crate::core::{Context, Request, Response, ResponseWriter};
use crate::endpoint::{write_error, BuildError, Endpoint, HandlerPanic, RegistrationError};
use crate::logging::Logger;
use crate::middleware::{Middleware, MiddlewareChain};

pub(crate) type RawHandler = Arc<dyn Fn(Request, ResponseWriter) + Send + Sync>;

/// What a registration dispatches to.
#[derive(Clone)]
pub(crate) enum Target {
    Endpoint(Arc<Endpoint>),
    Raw(RawHandler),
}

impl Target {
    /// Call the target; a panic becomes a logged 500 "unknown".
    fn call(&self, req: Request, ctx: &Context, logger: &dyn Logger) -> Response {
        match catch_unwind(AssertUnwindSafe(|| self.call_inner(req, ctx, logger))) {
            Ok(res) => res,
            Err(payload) => {
                let err = HandlerPanic::from_payload(payload.as_ref());
                let writer = ResponseWriter::new();
                write_error(&writer, ctx, logger, &err);
                writer.finish()
            }
        }
    }

    fn call_inner(&self, req: Request, ctx: &Context, logger: &dyn Logger) -> Response {
        match self {
            Target::Endpoint(endpoint) => endpoint.call(req, ctx, logger),
            Target::Raw(handler) => {
                let writer = ResponseWriter::new();
                handler(req, writer.clone());
                writer.finish()
            }
        }
    }
}

/// One successful registration, with every middleware that wraps it.
#[derive(Clone)]
pub(crate) struct Registration {
    pub(crate) method: Method,
    pub(crate) pattern: String,
    pub(crate) target: Target,
    pub(crate) middleware: Vec<Arc<dyn Middleware>>,
}

struct Route {
    method: Method,
    target: Target,
    chain: MiddlewareChain,
}

/// Routes registered at one pattern.
struct Methods(Vec<Route>);

impl Methods {
    fn find(&self, method: &Method) -> Option<&Route> {
        self.0.iter().find(|r| r.method == *method)
    }

    fn allow(&self) -> String {
        self.0
            .iter()
            .map(|r| r.method.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

struct Inner {
    router: matchit::Router<Methods>,
    fallback: MiddlewareChain,
    logger: Arc<dyn Logger>,
    routes: usize,
}

/// The built request handler of a route tree.
///
/// Cheap to clone; clones share the routing table.
#[derive(Clone)]
pub struct ApiHandler {
    inner: Arc<Inner>,
}

impl ApiHandler {
    pub(crate) fn build(
        registrations: &[Registration],
        root_middleware: &[Arc<dyn Middleware>],
        logger: Arc<dyn Logger>,
    ) -> Result<Self, BuildError> {
        let mut errors = Vec::new();
        let mut patterns: Vec<(String, Vec<Route>)> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for reg in registrations {
            let slot = *index.entry(reg.pattern.as_str()).or_insert_with(|| {
                patterns.push((reg.pattern.clone(), Vec::new()));
                patterns.len() - 1
            });
            let routes = &mut patterns[slot].1;
            if routes.iter().any(|r| r.method == reg.method) {
                errors.push(RegistrationError::DuplicateEndpoint {
                    method: reg.method.clone(),
                    pattern: reg.pattern.clone(),
                });
                continue;
            }
            routes.push(Route {
                method: reg.method.clone(),
                target: reg.target.clone(),
                chain: MiddlewareChain::from_list(reg.middleware.clone()),
            });
        }

        let mut router = matchit::Router::new();
        for (pattern, routes) in patterns {
            if let Err(source) = router.insert(pattern.clone(), Methods(routes)) {
                errors.push(RegistrationError::Conflict { pattern, source });
            }
        }

        if !errors.is_empty() {
            let messages = errors.iter().map(ToString::to_string).collect::<Vec<_>>();
            error!(errors = ?messages, "route table build failed");
            return Err(BuildError::new(errors));
        }

        debug!(routes = registrations.len(), "route table built");
        Ok(Self {
            inner: Arc::new(Inner {
                router,
                fallback: MiddlewareChain::from_list(root_middleware.to_vec()),
                logger,
                routes: registrations.len(),
            }),
        })
    }

    /// Number of (method, pattern) routes.
    pub fn route_count(&self) -> usize {
        self.inner.routes
    }

    /// Handle a request without client address information.
    pub fn serve(&self, req: Request) -> Response {
        self.serve_from(req, None)
    }

    /// Handle a request received from `client_addr`.
    pub fn serve_from(&self, mut req: Request, client_addr: Option<SocketAddr>) -> Response {
        let inner = &*self.inner;
        let matched = match inner.router.at(req.path()) {
            Ok(matched) => matched,
            Err(_) => {
                return inner.fallback_response(req, client_addr, StatusCode::NOT_FOUND, None);
            }
        };

        let Some(route) = matched.value.find(req.method()) else {
            let allow = matched.value.allow();
            return inner.fallback_response(
                req,
                client_addr,
                StatusCode::METHOD_NOT_ALLOWED,
                Some(allow),
            );
        };

        let params = matched
            .params
            .iter()
            .map(|(name, value)| {
                let value = percent_decode_str(value).decode_utf8_lossy().into_owned();
                (name.to_string(), value)
            })
            .collect();
        req.set_url_params(params);

        let mut ctx = Context::for_request(&req, client_addr);
        route.chain.process(req, &mut ctx, |req, ctx| {
            route.target.call(req, ctx, inner.logger.as_ref())
        })
    }
}

impl Inner {
    fn fallback_response(
        &self,
        req: Request,
        client_addr: Option<SocketAddr>,
        status: StatusCode,
        allow: Option<String>,
    ) -> Response {
        let mut ctx = Context::for_request(&req, client_addr);
        self.fallback.process(req, &mut ctx, |_, _| {
            let reason = match status {
                StatusCode::METHOD_NOT_ALLOWED => "method not allowed",
                _ => "not found",
            };
            let res = Response::error(status, reason);
            match allow {
                Some(allow) => res.with_header(ALLOW.as_str(), allow),
                None => res,
            }
        })
    }
}

impl fmt::Debug for ApiHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiHandler")
            .field("routes", &self.inner.routes)
            .field("fallback", &self.inner.fallback)
            .finish()
    }
}
