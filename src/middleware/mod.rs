//! Middleware pipeline for request/response processing.
//!
//! Middleware attach to route scopes (and everything below them) or to a
//! single endpoint through a `middleware(..)` param. They can:
//! - Inspect and modify incoming requests and the request [`Context`]
//! - Short-circuit dispatch and return early responses
//! - Modify outgoing responses
//!
//! # Example
//!
//! ```rust,ignore
//! use smartapi::middleware::{Middleware, MiddlewareResult};
//! use smartapi::core::{Context, Request, Response};
//!
//! struct RequireToken;
//!
//! impl Middleware for RequireToken {
//!     fn name(&self) -> &'static str { "require_token" }
//!
//!     fn on_request(&self, req: Request, ctx: &mut Context) -> MiddlewareResult {
//!         match req.header("x-token") {
//!             Some(token) => {
//!                 ctx.set("token", token.to_string());
//!                 MiddlewareResult::Next(req)
//!             }
//!             None => MiddlewareResult::Stop(Response::error(StatusCode::UNAUTHORIZED, "unauthorized")),
//!         }
//!     }
//! }
//! ```

mod chain;

pub mod access_log;

pub use access_log::AccessLogMiddleware;
pub use chain::MiddlewareChain;

use crate::core::{Context, Request, Response};

/// Result of middleware request processing.
#[derive(Debug)]
pub enum MiddlewareResult {
    /// Continue to the next middleware with the (possibly modified) request.
    Next(Request),
    /// Stop the chain and return this response immediately.
    Stop(Response),
}

impl MiddlewareResult {
    pub fn is_next(&self) -> bool {
        matches!(self, MiddlewareResult::Next(_))
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, MiddlewareResult::Stop(_))
    }
}

/// Trait for implementing middleware.
///
/// The pipeline executes `on_request` in order and `on_response` in
/// reverse order.
///
/// ```text
/// Request → MW1.on_request → MW2.on_request → Endpoint
///                                                ↓
/// Response ← MW1.on_response ← MW2.on_response ←─┘
/// ```
pub trait Middleware: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Ordering in the chain; lower runs first for requests.
    ///
    /// Middleware with equal priority keep declaration order, outer scopes
    /// before inner ones.
    fn priority(&self) -> i32 {
        0
    }

    /// Return `Next(req)` to continue or `Stop(res)` to short-circuit.
    fn on_request(&self, req: Request, _ctx: &mut Context) -> MiddlewareResult {
        MiddlewareResult::Next(req)
    }

    /// Called in reverse order after the endpoint returns.
    fn on_response(&self, res: Response, _ctx: &Context) -> Response {
        res
    }
}

/// Middleware built from a request closure.
pub struct FnMiddleware<F> {
    name: &'static str,
    f: F,
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(Request, &mut Context) -> MiddlewareResult + Send + Sync,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn on_request(&self, req: Request, ctx: &mut Context) -> MiddlewareResult {
        (self.f)(req, ctx)
    }
}

/// Wrap a request closure as middleware.
pub fn from_fn<F>(name: &'static str, f: F) -> FnMiddleware<F>
where
    F: Fn(Request, &mut Context) -> MiddlewareResult + Send + Sync,
{
    FnMiddleware { name, f }
}
