//! Route tree and request routing.
//!
//! A [`Scope`] collects endpoints and child scopes. Building it produces an
//! [`ApiHandler`]: a matchit table from path patterns to per-method routes,
//! each wrapped in the middleware of its scopes.
//!
//! ```rust,ignore
//! let mut api = Scope::new();
//! api.route("/v1", |v1| {
//!     v1.get("/users/{id}", find_user, [url_param("id")]);
//! }, [required_header("X-Token")]);
//! let handler = api.handler(Arc::new(NoopLogger))?;
//! ```
//!
//! Unmatched paths get a 404 and matched paths with an unregistered method
//! a 405 with an `Allow` header, both as JSON error bodies.

mod scope;
mod table;

pub use scope::{Routes, Scope, With};
pub use table::ApiHandler;
