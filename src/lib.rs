//! smartapi - declarative request binding and routing for HTTP APIs.
//!
//! Endpoints are plain functions. Each parameter is bound to a piece of the
//! request by a provider declared next to the function, and the return type
//! picks how the response is written. Every declaration is validated when
//! the route tree is built, so a server that starts never fails at request
//! time because of a mismatched signature.
//!
//! # Features
//!
//! - **Argument providers**: headers, cookies, query, form and URL params,
//!   bodies (JSON, text, bytes, reader) and the request context
//! - **Struct binding**: fill a request struct from tagged fields
//! - **Response strategies**: text, bytes, JSON or empty bodies from the
//!   handler's return type
//! - **Route scopes**: nested patterns sharing params and middleware
//! - **API errors**: status and reason propagated as JSON error bodies
//! - **HTTP/1.1 and HTTP/2** serving on hyper with graceful shutdown
//!
//! # Example
//!
//! ```rust,ignore
//! use smartapi::{as_int, url_param, ApiError, Json, Routes, Server};
//!
//! let mut server = Server::new();
//! server.get(
//!     "/users/{id}",
//!     |id: i64| -> Result<Json<User>, ApiError> { find_user(id).map(Json) },
//!     [as_int(url_param("id"))],
//! );
//! server.run().await?;
//! ```

/// Package version from Cargo.toml
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git commit hash (8 chars) with optional "-dirty" suffix
pub const BUILD_VERSION: &str = env!("BUILD_VERSION");

/// Full version string: "0.1.0 (abc12345)" or "0.1.0 (abc12345-dirty)"
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_VERSION"), ")");

pub mod binding;
pub mod config;
pub mod core;
pub mod endpoint;
pub mod logging;
pub mod middleware;
pub mod router;
pub mod server;

// Re-exports for convenience
pub use binding::{
    as_byte_slice, as_int, body_reader, byte_slice_body, context, cookie, header, json_body,
    json_body_direct, middleware, post_query_param, query_param, request, request_struct,
    request_struct_direct, required_cookie, required_header, required_post_query_param,
    required_query_param, response_cookies, response_headers, response_status, response_writer,
    string_body, url_param, Field, Param, ParamError, RequestStruct,
};
pub use config::Config;
pub use self::core::{ApiError, BoxError, Context, Request, Response, ResponseWriter};
pub use endpoint::{BuildError, Json, RegistrationError};
pub use logging::{Logger, NoopLogger, TracingLogger};
pub use router::{ApiHandler, Routes, Scope};
pub use server::{Server, ServerError};
