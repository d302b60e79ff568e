//! Request body providers.

use std::fmt;
use std::io::Read;
use std::marker::PhantomData;

use http::StatusCode;
use serde::de::DeserializeOwned;

use super::{ArgFlags, ArgType, Argument, Exchange, Param, ParamError, Value};
use crate::core::{ApiError, BodyReader, BoxError};

/// JSON-decoded body, either as `T` or as `Box<T>`.
struct JsonBody<T> {
    boxed: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for JsonBody<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonBody")
            .field("type", &std::any::type_name::<T>())
            .field("boxed", &self.boxed)
            .finish()
    }
}

impl<T: DeserializeOwned + 'static> Argument for JsonBody<T> {
    fn flags(&self) -> ArgFlags {
        ArgFlags::READS_BODY
    }

    fn check(&self, ty: ArgType) -> Result<(), ParamError> {
        if self.boxed {
            ty.expect::<Box<T>>()
        } else {
            ty.expect::<T>()
        }
    }

    fn extract(&self, ex: &mut Exchange<'_>) -> Result<Value, BoxError> {
        let value: T = serde_json::from_reader(ex.request.take_body())
            .map_err(|e| ApiError::wrap(StatusCode::BAD_REQUEST, e, "cannot unmarshal request"))?;
        if self.boxed {
            Ok(Box::new(Box::new(value)))
        } else {
            Ok(Box::new(value))
        }
    }
}

/// JSON body decoded into `Box<T>`; 400 `cannot unmarshal request` on bad input.
pub fn json_body<T: DeserializeOwned + 'static>() -> Param {
    Param::argument(JsonBody::<T> {
        boxed: true,
        _marker: PhantomData,
    })
}

/// JSON body decoded into `T`; 400 `cannot unmarshal request` on bad input.
pub fn json_body_direct<T: DeserializeOwned + 'static>() -> Param {
    Param::argument(JsonBody::<T> {
        boxed: false,
        _marker: PhantomData,
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Raw {
    String,
    Bytes,
    Reader,
}

#[derive(Debug)]
struct RawBody(Raw);

fn read_error(e: std::io::Error) -> BoxError {
    ApiError::wrap(StatusCode::BAD_REQUEST, e, "cannot read request").into()
}

impl Argument for RawBody {
    fn flags(&self) -> ArgFlags {
        ArgFlags::READS_BODY
    }

    fn check(&self, ty: ArgType) -> Result<(), ParamError> {
        match self.0 {
            Raw::String if ty.is::<String>() => Ok(()),
            Raw::String => Err(ParamError::ExpectedString(ty.name())),
            Raw::Bytes if ty.is::<Vec<u8>>() => Ok(()),
            Raw::Bytes => Err(ParamError::ExpectedByteSlice(ty.name())),
            Raw::Reader if ty.is::<BodyReader>() => Ok(()),
            Raw::Reader => Err(ParamError::ExpectedReader(ty.name())),
        }
    }

    fn extract(&self, ex: &mut Exchange<'_>) -> Result<Value, BoxError> {
        let mut body = ex.request.take_body();
        match self.0 {
            Raw::String => {
                let mut s = String::new();
                body.read_to_string(&mut s).map_err(read_error)?;
                Ok(Box::new(s))
            }
            Raw::Bytes => {
                let mut buf = Vec::new();
                body.read_to_end(&mut buf).map_err(read_error)?;
                Ok(Box::new(buf))
            }
            Raw::Reader => Ok(Box::new(body)),
        }
    }
}

/// Whole body as UTF-8 text; 400 `cannot read request` on I/O or encoding failure.
pub fn string_body() -> Param {
    Param::argument(RawBody(Raw::String))
}

/// Whole body as bytes; 400 `cannot read request` on I/O failure.
pub fn byte_slice_body() -> Param {
    Param::argument(RawBody(Raw::Bytes))
}

/// The body stream, unread.
pub fn body_reader() -> Param {
    Param::argument(RawBody(Raw::Reader))
}
