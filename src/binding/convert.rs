//! Converters wrapping string-producing providers.

use std::sync::Arc;

use http::StatusCode;

use super::{downcast, ArgFlags, ArgType, Argument, Exchange, Param, ParamError, Value};
use crate::core::{ApiError, BoxError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Target {
    Int,
    Bytes,
}

#[derive(Debug)]
struct Convert {
    target: Target,
    inner: Arc<dyn Argument>,
}

impl Argument for Convert {
    fn flags(&self) -> ArgFlags {
        self.inner.flags()
    }

    fn check(&self, ty: ArgType) -> Result<(), ParamError> {
        match self.target {
            Target::Int => ty.expect::<i64>(),
            Target::Bytes if ty.is::<Vec<u8>>() => Ok(()),
            Target::Bytes => Err(ParamError::ExpectedByteSlice(ty.name())),
        }
    }

    fn extract(&self, ex: &mut Exchange<'_>) -> Result<Value, BoxError> {
        let raw: String = downcast(self.inner.extract(ex)?)?;
        match self.target {
            Target::Int => {
                let n: i64 = raw.parse().map_err(|e| {
                    ApiError::wrap(StatusCode::BAD_REQUEST, e, "integer parse error")
                })?;
                Ok(Box::new(n))
            }
            Target::Bytes => Ok(Box::new(raw.into_bytes())),
        }
    }
}

fn wrap(param: Param, target: Target, wrap_err: fn(Box<ParamError>) -> ParamError) -> Param {
    let inner = match param {
        Param::Argument(inner) => inner,
        Param::Invalid(err) => return Param::Invalid(wrap_err(Box::new(err))),
        _ => return Param::Invalid(wrap_err(Box::new(ParamError::RequiresArgument))),
    };
    if let Err(err) = inner.check(ArgType::of::<String>()) {
        return Param::Invalid(wrap_err(Box::new(err)));
    }
    Param::argument(Convert { target, inner })
}

/// Parse a string provider's value as `i64`; 400 `integer parse error` on failure.
///
/// The wrapped provider must produce a `String`.
pub fn as_int(param: Param) -> Param {
    wrap(param, Target::Int, ParamError::AsInt)
}

/// Hand a string provider's value over as `Vec<u8>`.
pub fn as_byte_slice(param: Param) -> Param {
    wrap(param, Target::Bytes, ParamError::AsByteSlice)
}
