//! Core request/response types.
//!
//! - [`Request`] - request with a streaming body, path params and lazy form parsing
//! - [`Response`] - response produced by a dispatch
//! - [`Context`] - request-scoped values shared by middleware and handlers
//! - [`ApiError`] - error with HTTP status and public reason
//! - [`ResponseWriter`], [`Headers`], [`Cookies`] - response sinks for handlers

mod context;
mod error;
mod form;
mod request;
mod response;
mod writer;

pub use context::Context;
pub use error::{error_body, find_api_error, ApiError, BoxError, UNKNOWN_REASON};
pub use form::{parse_cookies, parse_urlencoded, Form, FormError};
pub use request::{BodyReader, FormData, Request, MAX_FORM_BODY};
pub use response::Response;
pub(crate) use response::content_types;
pub use writer::{Cookie, Cookies, Headers, ResponseWriter, SameSite};
