//! Ordered middleware list attached to an endpoint.

use std::fmt;
use std::sync::Arc;

use super::{Middleware, MiddlewareResult};
use crate::core::{Context, Request, Response};

/// Middleware run around one endpoint.
///
/// Requests pass through in priority order (lowest first), responses in
/// reverse. The sort is stable, so declaration order breaks ties.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a chain from middleware in declaration order.
    pub fn from_list(middlewares: Vec<Arc<dyn Middleware>>) -> Self {
        let mut chain = Self { middlewares };
        chain.middlewares.sort_by_key(|m| m.priority());
        chain
    }

    /// Add a middleware to the chain.
    pub fn add<M: Middleware + 'static>(self, middleware: M) -> Self {
        self.add_arc(Arc::new(middleware))
    }

    /// Add a middleware wrapped in Arc to the chain.
    pub fn add_arc(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self.middlewares.sort_by_key(|m| m.priority());
        self
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Middleware names in execution order.
    pub fn names(&self) -> Vec<&'static str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }

    /// Run `on_request` hooks until one short-circuits.
    pub fn process_request(&self, mut req: Request, ctx: &mut Context) -> MiddlewareResult {
        for mw in &self.middlewares {
            match mw.on_request(req, ctx) {
                MiddlewareResult::Next(r) => req = r,
                MiddlewareResult::Stop(res) => {
                    tracing::debug!(
                        middleware = mw.name(),
                        status = %res.status(),
                        request_id = %ctx.request_id,
                        "middleware short-circuited request"
                    );
                    return MiddlewareResult::Stop(res);
                }
            }
        }
        MiddlewareResult::Next(req)
    }

    /// Run `on_response` hooks in reverse order.
    pub fn process_response(&self, mut res: Response, ctx: &Context) -> Response {
        for mw in self.middlewares.iter().rev() {
            res = mw.on_response(res, ctx);
        }
        res
    }

    /// Run a full cycle around `handler`.
    ///
    /// Response hooks also run when a request hook short-circuits.
    pub fn process<F>(&self, req: Request, ctx: &mut Context, handler: F) -> Response
    where
        F: FnOnce(Request, &mut Context) -> Response,
    {
        let req = match self.process_request(req, ctx) {
            MiddlewareResult::Next(req) => req,
            MiddlewareResult::Stop(res) => return self.process_response(res, ctx),
        };

        let res = handler(req, ctx);
        self.process_response(res, ctx)
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
