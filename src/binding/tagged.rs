//! Struct binding driven by field tags.
//!
//! A type implementing [`RequestStruct`] lists its bindable fields, each with
//! a tag of the form `kind[=data]`:
//!
//! | tag | provider |
//! |---|---|
//! | `header=X`, `r_header=X` | [`header`], [`required_header`] |
//! | `cookie=X`, `r_cookie=X` | [`cookie`], [`required_cookie`] |
//! | `query_param=X`, `r_query_param=X` | [`query_param`], [`required_query_param`] |
//! | `post_query_param=X`, `r_post_query_param=X` | [`post_query_param`], [`required_post_query_param`] |
//! | `url_param=X` | [`url_param`] |
//! | `json_body` | [`json_body`] / [`json_body_direct`], field declared with [`Field::json`] |
//! | `string_body`, `byte_slice_body`, `body_reader` | raw body providers |
//! | `context`, `request`, `response_writer` | request/response capabilities |
//! | `response_headers`, `response_cookies` | response sinks |
//! | `request_struct` | nested struct, field declared with [`Field::nested`] |
//! | `as_int=<tag>`, `as_byte_slice=<tag>` | [`as_int`], [`as_byte_slice`] over the inner tag |
//!
//! ```rust,ignore
//! #[derive(Default)]
//! struct Search {
//!     term: String,
//!     page: i64,
//! }
//!
//! impl RequestStruct for Search {
//!     fn fields() -> Vec<Field<Self>> {
//!         vec![
//!             Field::new("term", "r_query_param=q", |s: &mut Self, v| s.term = v),
//!             Field::new("page", "as_int=query_param=page", |s: &mut Self, v| s.page = v),
//!         ]
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use super::body::{body_reader, byte_slice_body, json_body, json_body_direct, string_body};
use super::convert::{as_byte_slice, as_int};
use super::providers::{
    context, cookie, header, post_query_param, query_param, request, required_cookie,
    required_header, required_post_query_param, required_query_param, response_cookies,
    response_headers, response_writer, url_param,
};
use super::{downcast, ArgFlags, ArgType, Argument, Exchange, Param, ParamError, Value};
use crate::core::BoxError;
use crate::endpoint::InvocationError;

/// A struct whose fields are filled from the request.
///
/// Fields not returned by [`RequestStruct::fields`] keep their default.
pub trait RequestStruct: Default + 'static {
    fn fields() -> Vec<Field<Self>>;
}

type Setter<S> = Arc<dyn Fn(&mut S, Value) -> Result<(), InvocationError> + Send + Sync>;

/// Picks the provider for a field from its type.
type Factory = fn(ArgType) -> Param;

/// One tagged field of a [`RequestStruct`].
pub struct Field<S> {
    name: &'static str,
    tag: &'static str,
    ty: ArgType,
    set: Setter<S>,
    json: Option<Factory>,
    nested: Option<Factory>,
}

impl<S: 'static> Field<S> {
    /// A field of type `T` bound by `tag`.
    pub fn new<T, F>(name: &'static str, tag: &'static str, set: F) -> Self
    where
        T: 'static,
        F: Fn(&mut S, T) + Send + Sync + 'static,
    {
        Self {
            name,
            tag,
            ty: ArgType::of::<T>(),
            set: Arc::new(move |s, value| {
                set(s, downcast::<T>(value)?);
                Ok(())
            }),
            json: None,
            nested: None,
        }
    }

    /// A field that may use the `json_body` tag, decoding `J`.
    ///
    /// The field type `T` is `J` or `Box<J>`.
    pub fn json<J, T, F>(name: &'static str, tag: &'static str, set: F) -> Self
    where
        J: DeserializeOwned + 'static,
        T: 'static,
        F: Fn(&mut S, T) + Send + Sync + 'static,
    {
        Self {
            json: Some(json_factory::<J>),
            ..Self::new(name, tag, set)
        }
    }

    /// A field that may use the `request_struct` tag, binding `N`.
    ///
    /// The field type `T` is `N` or `Box<N>`.
    pub fn nested<N, T, F>(name: &'static str, tag: &'static str, set: F) -> Self
    where
        N: RequestStruct,
        T: 'static,
        F: Fn(&mut S, T) + Send + Sync + 'static,
    {
        Self {
            nested: Some(nested_factory::<N>),
            ..Self::new(name, tag, set)
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }
}

fn json_factory<J: DeserializeOwned + 'static>(ty: ArgType) -> Param {
    if ty.is::<J>() {
        json_body_direct::<J>()
    } else {
        json_body::<J>()
    }
}

fn nested_factory<N: RequestStruct>(ty: ArgType) -> Param {
    if ty.is::<N>() {
        request_struct_direct::<N>()
    } else {
        request_struct::<N>()
    }
}

/// Resolve a `kind[=data]` tag to a provider.
fn parse_tag<S>(tag: &str, field: &Field<S>) -> Result<Param, ParamError> {
    let (kind, data) = match tag.split_once('=') {
        Some((kind, data)) => (kind, Some(data)),
        None => (tag, None),
    };
    let value = || {
        data.filter(|d| !d.is_empty())
            .ok_or_else(|| ParamError::MissingTagValue(kind.to_string()))
    };

    let param = match kind {
        "header" => header(value()?),
        "r_header" => required_header(value()?),
        "cookie" => cookie(value()?),
        "r_cookie" => required_cookie(value()?),
        "query_param" => query_param(value()?),
        "r_query_param" => required_query_param(value()?),
        "post_query_param" => post_query_param(value()?),
        "r_post_query_param" => required_post_query_param(value()?),
        "url_param" => url_param(value()?),
        "json_body" => field.json.ok_or(ParamError::MissingDecoder)?(field.ty),
        "string_body" => string_body(),
        "byte_slice_body" => byte_slice_body(),
        "body_reader" => body_reader(),
        "context" => context(),
        "request" => request(),
        "response_writer" => response_writer(),
        "response_headers" => response_headers(),
        "response_cookies" => response_cookies(),
        "request_struct" => field.nested.ok_or(ParamError::MissingNestedStruct)?(field.ty),
        "as_int" => {
            let inner =
                parse_tag(value()?, field).map_err(|e| ParamError::AsInt(Box::new(e)))?;
            as_int(inner)
        }
        "as_byte_slice" => {
            let inner =
                parse_tag(value()?, field).map_err(|e| ParamError::AsByteSlice(Box::new(e)))?;
            as_byte_slice(inner)
        }
        _ => return Err(ParamError::UnsupportedTag(tag.to_string())),
    };
    Ok(param)
}

struct BoundField<S> {
    name: &'static str,
    arg: Arc<dyn Argument>,
    set: Setter<S>,
}

/// Provider filling a whole struct, as `S` or `Box<S>`.
struct StructArg<S> {
    boxed: bool,
    fields: Vec<BoundField<S>>,
    flags: ArgFlags,
}

impl<S> fmt::Debug for StructArg<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestStruct")
            .field("type", &std::any::type_name::<S>())
            .field("boxed", &self.boxed)
            .field(
                "fields",
                &self.fields.iter().map(|b| (b.name, &b.arg)).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<S: RequestStruct> Argument for StructArg<S> {
    fn flags(&self) -> ArgFlags {
        self.flags
    }

    fn check(&self, ty: ArgType) -> Result<(), ParamError> {
        let ok = if self.boxed {
            ty.is::<Box<S>>()
        } else {
            ty.is::<S>()
        };
        if ok {
            Ok(())
        } else {
            Err(ParamError::InvalidRequestStruct(ty.name()))
        }
    }

    fn extract(&self, ex: &mut Exchange<'_>) -> Result<Value, BoxError> {
        let mut target = S::default();
        for field in &self.fields {
            let value = field.arg.extract(ex)?;
            (field.set)(&mut target, value)?;
        }
        if self.boxed {
            Ok(Box::new(Box::new(target)))
        } else {
            Ok(Box::new(target))
        }
    }
}

fn bind<S: RequestStruct>(boxed: bool) -> Result<StructArg<S>, ParamError> {
    let mut fields = Vec::new();
    let mut flags = ArgFlags::NONE;

    for field in S::fields() {
        if field.tag.is_empty() {
            continue;
        }

        let arg = match parse_tag(field.tag, &field) {
            Ok(Param::Argument(arg)) => arg,
            Ok(Param::Invalid(err)) | Err(err) => return Err(err.in_field(field.name)),
            Ok(_) => {
                return Err(ParamError::UnsupportedTag(field.tag.to_string()).in_field(field.name))
            }
        };
        arg.check(field.ty).map_err(|e| e.in_field(field.name))?;

        flags = flags.union(arg.flags());
        fields.push(BoundField {
            name: field.name,
            arg,
            set: field.set,
        });
    }

    if flags.body_readers > 1 {
        return Err(ParamError::MultipleBodyReaders);
    }

    Ok(StructArg {
        boxed,
        fields,
        flags,
    })
}

fn build<S: RequestStruct>(boxed: bool) -> Param {
    match bind::<S>(boxed) {
        Ok(arg) => Param::argument(arg),
        Err(err) => Param::Invalid(err),
    }
}

/// Bind a [`RequestStruct`] into a `Box<S>` parameter.
pub fn request_struct<S: RequestStruct>() -> Param {
    build::<S>(true)
}

/// Bind a [`RequestStruct`] into an `S` parameter.
pub fn request_struct_direct<S: RequestStruct>() -> Param {
    build::<S>(false)
}
