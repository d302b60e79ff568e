//! Argument providers.
//!
//! A provider is declared once per endpoint parameter, checked against the
//! handler's parameter type at registration time, and asked for a value on
//! every request. Providers are immutable after construction and shared by
//! all requests to their endpoint.
//!
//! ```rust,ignore
//! api.get(
//!     "/users/{id}",
//!     |id: i64, token: String| -> Result<Json<User>, ApiError> { ... },
//!     [as_int(url_param("id")), required_header("X-Token")],
//! );
//! ```

mod body;
mod convert;
mod error;
mod providers;
mod tagged;

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use http::StatusCode;

pub use body::{body_reader, byte_slice_body, json_body, json_body_direct, string_body};
pub use convert::{as_byte_slice, as_int};
pub use error::ParamError;
pub use providers::{
    context, cookie, header, middleware, post_query_param, query_param, request, required_cookie,
    required_header, required_post_query_param, required_query_param, response_cookies,
    response_headers, response_status, response_writer, url_param,
};
pub use tagged::{request_struct, request_struct_direct, Field, RequestStruct};

pub(crate) use providers::form_error;

use crate::core::{BoxError, Context, Request, ResponseWriter};
use crate::middleware::Middleware;

/// Type-erased argument value.
pub type Value = Box<dyn Any>;

/// Runtime description of a handler parameter type.
#[derive(Clone, Copy)]
pub struct ArgType {
    id: TypeId,
    name: &'static str,
}

impl ArgType {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Ok when this is `T`, otherwise a mismatch naming both types.
    pub(crate) fn expect<T: 'static>(&self) -> Result<(), ParamError> {
        if self.is::<T>() {
            Ok(())
        } else {
            Err(ParamError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                found: self.name,
            })
        }
    }
}

impl PartialEq for ArgType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ArgType {}

impl fmt::Debug for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// What a provider does besides producing a value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArgFlags {
    /// Needs the query/form data parsed.
    pub parses_query: bool,
    /// Number of request body readers, counted through nested structs.
    pub body_readers: usize,
    /// Writes the response directly.
    pub writes_response: bool,
}

impl ArgFlags {
    pub const NONE: ArgFlags = ArgFlags {
        parses_query: false,
        body_readers: 0,
        writes_response: false,
    };

    pub const PARSES_QUERY: ArgFlags = ArgFlags {
        parses_query: true,
        ..ArgFlags::NONE
    };

    pub const READS_BODY: ArgFlags = ArgFlags {
        body_readers: 1,
        ..ArgFlags::NONE
    };

    pub const WRITES_RESPONSE: ArgFlags = ArgFlags {
        writes_response: true,
        ..ArgFlags::NONE
    };

    /// Combine flags of several providers.
    pub fn union(self, other: ArgFlags) -> ArgFlags {
        ArgFlags {
            parses_query: self.parses_query || other.parses_query,
            body_readers: self.body_readers + other.body_readers,
            writes_response: self.writes_response || other.writes_response,
        }
    }
}

/// Everything a provider may read from or write to during extraction.
pub struct Exchange<'a> {
    pub request: &'a mut Request,
    pub context: &'a Context,
    pub response: &'a ResponseWriter,
}

/// A source of one handler argument.
pub trait Argument: Send + Sync + fmt::Debug {
    fn flags(&self) -> ArgFlags {
        ArgFlags::NONE
    }

    /// Check the provider can produce values of type `ty`.
    fn check(&self, ty: ArgType) -> Result<(), ParamError>;

    /// Produce the value for the current request.
    ///
    /// The returned value must be of the type accepted by `check`.
    fn extract(&self, ex: &mut Exchange<'_>) -> Result<Value, BoxError>;
}

/// One entry in an endpoint or route declaration.
#[derive(Clone)]
pub enum Param {
    /// Binds the next handler parameter.
    Argument(Arc<dyn Argument>),
    /// Overrides the success status code.
    Status(StatusCode),
    /// Wraps the endpoint in a middleware.
    Middleware(Arc<dyn Middleware>),
    /// A declaration that failed to construct; registering it fails.
    Invalid(ParamError),
}

impl Param {
    pub fn argument<A: Argument + 'static>(arg: A) -> Self {
        Param::Argument(Arc::new(arg))
    }

    pub fn is_argument(&self) -> bool {
        matches!(self, Param::Argument(_))
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Argument(arg) => f.debug_tuple("Argument").field(arg).finish(),
            Param::Status(status) => f.debug_tuple("Status").field(status).finish(),
            Param::Middleware(mw) => f.debug_tuple("Middleware").field(&mw.name()).finish(),
            Param::Invalid(err) => f.debug_tuple("Invalid").field(err).finish(),
        }
    }
}

/// Downcast an extracted value, reporting the expected type on mismatch.
pub(crate) fn downcast<T: 'static>(value: Value) -> Result<T, crate::endpoint::InvocationError> {
    value
        .downcast::<T>()
        .map(|v| *v)
        .map_err(|_| crate::endpoint::InvocationError::Downcast(std::any::type_name::<T>()))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_type_identity() {
        assert_eq!(ArgType::of::<String>(), ArgType::of::<String>());
        assert_ne!(ArgType::of::<String>(), ArgType::of::<&'static str>());
        assert!(ArgType::of::<Vec<u8>>().is::<Vec<u8>>());
        assert_eq!(ArgType::of::<i64>().name(), "i64");
    }

    #[test]
    fn test_expect_mismatch() {
        let err = ArgType::of::<u32>().expect::<String>().unwrap_err();
        assert_eq!(
            err,
            ParamError::TypeMismatch {
                expected: "alloc::string::String",
                found: "u32"
            }
        );
    }

    #[test]
    fn test_flags_union() {
        let flags = ArgFlags::PARSES_QUERY
            .union(ArgFlags::READS_BODY)
            .union(ArgFlags::READS_BODY);
        assert!(flags.parses_query);
        assert_eq!(flags.body_readers, 2);
        assert!(!flags.writes_response);
    }
}
