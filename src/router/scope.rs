//! Route scopes and endpoint registration.

use std::sync::Arc;

use http::Method;
use tracing::debug;

use super::table::{ApiHandler, Registration, Target};
use crate::binding::Param;
use crate::core::{Request, ResponseWriter};
use crate::endpoint::{BuildError, Endpoint, Handler, RegistrationError};
use crate::logging::Logger;
use crate::middleware::Middleware;

/// Registration of endpoints by HTTP method.
///
/// ```rust,ignore
/// api.get("/users/{id}", find_user, [url_param("id")])
///    .post("/users", create_user, [json_body::<NewUser>()]);
/// ```
pub trait Routes {
    /// Register `handler` for `method` at `pattern`.
    ///
    /// Declaration errors are collected and reported when the handler is
    /// built; registration itself never fails.
    fn add_endpoint<H, A>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: H,
        params: impl IntoIterator<Item = Param>,
    ) -> &mut Self
    where
        H: Handler<A>,
        A: 'static;

    fn get<H, A>(
        &mut self,
        pattern: &str,
        handler: H,
        params: impl IntoIterator<Item = Param>,
    ) -> &mut Self
    where
        H: Handler<A>,
        A: 'static,
    {
        self.add_endpoint(Method::GET, pattern, handler, params)
    }

    fn post<H, A>(
        &mut self,
        pattern: &str,
        handler: H,
        params: impl IntoIterator<Item = Param>,
    ) -> &mut Self
    where
        H: Handler<A>,
        A: 'static,
    {
        self.add_endpoint(Method::POST, pattern, handler, params)
    }

    fn put<H, A>(
        &mut self,
        pattern: &str,
        handler: H,
        params: impl IntoIterator<Item = Param>,
    ) -> &mut Self
    where
        H: Handler<A>,
        A: 'static,
    {
        self.add_endpoint(Method::PUT, pattern, handler, params)
    }

    fn patch<H, A>(
        &mut self,
        pattern: &str,
        handler: H,
        params: impl IntoIterator<Item = Param>,
    ) -> &mut Self
    where
        H: Handler<A>,
        A: 'static,
    {
        self.add_endpoint(Method::PATCH, pattern, handler, params)
    }

    fn delete<H, A>(
        &mut self,
        pattern: &str,
        handler: H,
        params: impl IntoIterator<Item = Param>,
    ) -> &mut Self
    where
        H: Handler<A>,
        A: 'static,
    {
        self.add_endpoint(Method::DELETE, pattern, handler, params)
    }

    fn head<H, A>(
        &mut self,
        pattern: &str,
        handler: H,
        params: impl IntoIterator<Item = Param>,
    ) -> &mut Self
    where
        H: Handler<A>,
        A: 'static,
    {
        self.add_endpoint(Method::HEAD, pattern, handler, params)
    }

    fn options<H, A>(
        &mut self,
        pattern: &str,
        handler: H,
        params: impl IntoIterator<Item = Param>,
    ) -> &mut Self
    where
        H: Handler<A>,
        A: 'static,
    {
        self.add_endpoint(Method::OPTIONS, pattern, handler, params)
    }

    fn connect<H, A>(
        &mut self,
        pattern: &str,
        handler: H,
        params: impl IntoIterator<Item = Param>,
    ) -> &mut Self
    where
        H: Handler<A>,
        A: 'static,
    {
        self.add_endpoint(Method::CONNECT, pattern, handler, params)
    }

    fn trace<H, A>(
        &mut self,
        pattern: &str,
        handler: H,
        params: impl IntoIterator<Item = Param>,
    ) -> &mut Self
    where
        H: Handler<A>,
        A: 'static,
    {
        self.add_endpoint(Method::TRACE, pattern, handler, params)
    }
}

/// A node of the route tree.
///
/// Params declared on a scope are prepended to the params of every endpoint
/// below it, outermost scope first. Middleware applies to every endpoint of
/// this scope and of its descendants, whenever it was added; the chains are
/// resolved when the handler is built.
#[derive(Default)]
pub struct Scope {
    prefix: String,
    params: Vec<Param>,
    middleware: Vec<Arc<dyn Middleware>>,
    entries: Vec<Entry>,
    errors: Vec<RegistrationError>,
}

/// A declaration made on a scope, with the middleware of the `With` that
/// made it.
enum Entry {
    Route {
        method: Method,
        pattern: String,
        target: Target,
        middleware: Vec<Arc<dyn Middleware>>,
    },
    Child {
        scope: Scope,
        middleware: Vec<Arc<dyn Middleware>>,
    },
}

impl Scope {
    /// An empty root scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add middleware for this scope and its descendants.
    pub fn use_middleware<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Registrations through the returned value also run `middleware`.
    pub fn with<M: Middleware + 'static>(&mut self, middleware: M) -> With<'_> {
        With {
            scope: self,
            middleware: vec![Arc::new(middleware)],
        }
    }

    /// Declare a child scope under `pattern`.
    ///
    /// `params` are added after the ones inherited from this scope;
    /// `middleware(..)` params become middleware of the child.
    pub fn route<F>(
        &mut self,
        pattern: &str,
        build: F,
        params: impl IntoIterator<Item = Param>,
    ) -> &mut Self
    where
        F: FnOnce(&mut Scope),
    {
        self.mount(pattern, build, params, &[])
    }

    /// Register a handler that gets the request and response directly.
    ///
    /// No params, validation or response strategy apply; whatever the
    /// handler writes is sent as is.
    pub fn raw<F>(&mut self, method: Method, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(Request, ResponseWriter) + Send + Sync + 'static,
    {
        self.push_raw(method, pattern, Arc::new(handler), &[])
    }

    /// Build the servable handler, or every registration error in the tree.
    ///
    /// Can be called repeatedly; each call builds an equivalent handler.
    pub fn handler(&self, logger: Arc<dyn Logger>) -> Result<ApiHandler, BuildError> {
        if !self.errors.is_empty() {
            let errors = self.errors.iter().map(ToString::to_string).collect::<Vec<_>>();
            tracing::error!(errors = ?errors, "route registration failed");
            return Err(BuildError::new(self.errors.clone()));
        }
        let mut registrations = Vec::new();
        self.collect(&[], &mut registrations);
        ApiHandler::build(&registrations, &self.middleware, logger)
    }

    /// Number of successfully declared endpoints, raw handlers included.
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| match entry {
                Entry::Route { .. } => 1,
                Entry::Child { scope, .. } => scope.len(),
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn full_pattern(&self, pattern: &str) -> String {
        join(&self.prefix, pattern)
    }

    /// Flatten the tree into registrations, outer middleware first.
    fn collect(&self, outer: &[Arc<dyn Middleware>], out: &mut Vec<Registration>) {
        let chain: Vec<Arc<dyn Middleware>> =
            outer.iter().chain(&self.middleware).cloned().collect();
        for entry in &self.entries {
            match entry {
                Entry::Route {
                    method,
                    pattern,
                    target,
                    middleware,
                } => out.push(Registration {
                    method: method.clone(),
                    pattern: pattern.clone(),
                    target: target.clone(),
                    middleware: chain.iter().chain(middleware).cloned().collect(),
                }),
                Entry::Child { scope, middleware } => {
                    let outer: Vec<_> = chain.iter().chain(middleware).cloned().collect();
                    scope.collect(&outer, out);
                }
            }
        }
    }

    fn mount<F>(
        &mut self,
        pattern: &str,
        build: F,
        params: impl IntoIterator<Item = Param>,
        extra: &[Arc<dyn Middleware>],
    ) -> &mut Self
    where
        F: FnOnce(&mut Scope),
    {
        let mut child = Scope {
            prefix: self.full_pattern(pattern),
            params: self.params.clone(),
            ..Scope::default()
        };
        for param in params {
            match param {
                Param::Middleware(mw) => child.middleware.push(mw),
                other => child.params.push(other),
            }
        }

        build(&mut child);

        let errors = std::mem::take(&mut child.errors);
        self.errors
            .extend(errors.into_iter().map(|e| e.in_route(pattern)));
        self.entries.push(Entry::Child {
            scope: child,
            middleware: extra.to_vec(),
        });
        self
    }

    fn register<H, A>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: H,
        params: impl IntoIterator<Item = Param>,
        extra: &[Arc<dyn Middleware>],
    ) -> &mut Self
    where
        H: Handler<A>,
        A: 'static,
    {
        let params = self.params.iter().cloned().chain(params).collect();
        match Endpoint::new(handler, params) {
            Ok(endpoint) => {
                let full = self.full_pattern(pattern);
                debug!(
                    method = %method,
                    pattern = %full,
                    strategy = ?endpoint.strategy(),
                    "endpoint registered"
                );
                let middleware = extra
                    .iter()
                    .chain(endpoint.middleware())
                    .cloned()
                    .collect();
                self.entries.push(Entry::Route {
                    method,
                    pattern: full,
                    target: Target::Endpoint(Arc::new(endpoint)),
                    middleware,
                });
            }
            Err(err) => self.errors.push(err.in_endpoint(pattern)),
        }
        self
    }

    fn push_raw(
        &mut self,
        method: Method,
        pattern: &str,
        handler: Arc<dyn Fn(Request, ResponseWriter) + Send + Sync>,
        extra: &[Arc<dyn Middleware>],
    ) -> &mut Self {
        let full = self.full_pattern(pattern);
        debug!(method = %method, pattern = %full, "raw handler registered");
        self.entries.push(Entry::Route {
            method,
            pattern: full,
            target: Target::Raw(handler),
            middleware: extra.to_vec(),
        });
        self
    }
}

impl Routes for Scope {
    fn add_endpoint<H, A>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: H,
        params: impl IntoIterator<Item = Param>,
    ) -> &mut Self
    where
        H: Handler<A>,
        A: 'static,
    {
        self.register(method, pattern, handler, params, &[])
    }
}

/// A scope with extra middleware for the registrations made through it.
pub struct With<'a> {
    scope: &'a mut Scope,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl With<'_> {
    /// Add more middleware.
    pub fn with<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Like [`Scope::route`], with this value's middleware added to the child.
    pub fn route<F>(
        &mut self,
        pattern: &str,
        build: F,
        params: impl IntoIterator<Item = Param>,
    ) -> &mut Self
    where
        F: FnOnce(&mut Scope),
    {
        self.scope.mount(pattern, build, params, &self.middleware);
        self
    }

    /// Like [`Scope::raw`], with this value's middleware.
    pub fn raw<F>(&mut self, method: Method, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(Request, ResponseWriter) + Send + Sync + 'static,
    {
        self.scope
            .push_raw(method, pattern, Arc::new(handler), &self.middleware);
        self
    }
}

impl Routes for With<'_> {
    fn add_endpoint<H, A>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: H,
        params: impl IntoIterator<Item = Param>,
    ) -> &mut Self
    where
        H: Handler<A>,
        A: 'static,
    {
        self.scope
            .register(method, pattern, handler, params, &self.middleware);
        self
    }
}

/// Join a scope prefix and a pattern with exactly one `/`.
pub(crate) fn join(prefix: &str, pattern: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if pattern.starts_with('/') {
        format!("{}{}", prefix, pattern)
    } else {
        format!("{}/{}", prefix, pattern)
    }
}
