//! Return shapes of handlers.
//!
//! A handler returns one of:
//!
//! - `()`: nothing to write
//! - `Result<(), E>`: an error or nothing
//! - `Result<T, E>` where `T` is a [`ReturnValue`]: a body or an error
//!
//! Other shapes (bare values, tuples) still implement [`Reply`] so that the
//! endpoint can reject them at registration with a precise error instead of
//! failing to compile with an opaque trait error.

use bytes::Bytes;
use serde::Serialize;

use crate::core::BoxError;

/// Kind of one returned value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReturnKind {
    Unit,
    Text,
    Bytes,
    Json,
    Error,
    /// A value that cannot be written as a response body.
    Unsupported(&'static str),
}

/// JSON-encoded response body.
///
/// ```rust,ignore
/// api.get("/users/{id}", |id: String| -> Result<Json<User>, ApiError> {
///     Ok(Json(store.find(&id)?))
/// }, [url_param("id")]);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

/// A response body produced by a handler.
#[derive(Debug)]
pub enum Payload {
    Text(String),
    Bytes(Bytes),
    /// Encoded JSON; `None` is a null value.
    Json(Result<Option<Vec<u8>>, serde_json::Error>),
    /// Not writable as a body.
    Invalid,
}

/// What a handler invocation produced.
#[derive(Debug)]
pub enum Outcome {
    Done,
    Failed(BoxError),
    Payload(Payload),
    /// The returned value does not fit any response strategy.
    Invalid,
}

/// A value that can be the success half of a handler's `Result`.
pub trait ReturnValue: 'static {
    const KIND: ReturnKind;

    fn into_payload(self) -> Payload;
}

impl ReturnValue for () {
    const KIND: ReturnKind = ReturnKind::Unit;

    fn into_payload(self) -> Payload {
        Payload::Invalid
    }
}

impl ReturnValue for String {
    const KIND: ReturnKind = ReturnKind::Text;

    fn into_payload(self) -> Payload {
        Payload::Text(self)
    }
}

impl ReturnValue for &'static str {
    const KIND: ReturnKind = ReturnKind::Text;

    fn into_payload(self) -> Payload {
        Payload::Text(self.to_string())
    }
}

impl ReturnValue for Vec<u8> {
    const KIND: ReturnKind = ReturnKind::Bytes;

    fn into_payload(self) -> Payload {
        Payload::Bytes(Bytes::from(self))
    }
}

impl ReturnValue for Bytes {
    const KIND: ReturnKind = ReturnKind::Bytes;

    fn into_payload(self) -> Payload {
        Payload::Bytes(self)
    }
}

impl<T: Serialize + 'static> ReturnValue for Json<T> {
    const KIND: ReturnKind = ReturnKind::Json;

    fn into_payload(self) -> Payload {
        Payload::Json(serde_json::to_vec(&self.0).map(Some))
    }
}

impl<T: Serialize + 'static> ReturnValue for Option<Json<T>> {
    const KIND: ReturnKind = ReturnKind::Json;

    fn into_payload(self) -> Payload {
        match self {
            Some(json) => json.into_payload(),
            None => Payload::Json(Ok(None)),
        }
    }
}

impl ReturnValue for serde_json::Value {
    const KIND: ReturnKind = ReturnKind::Json;

    fn into_payload(self) -> Payload {
        if self.is_null() {
            Payload::Json(Ok(None))
        } else {
            Payload::Json(serde_json::to_vec(&self).map(Some))
        }
    }
}

macro_rules! unsupported_return_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ReturnValue for $ty {
                const KIND: ReturnKind = ReturnKind::Unsupported(stringify!($ty));

                fn into_payload(self) -> Payload {
                    Payload::Invalid
                }
            }
        )*
    };
}

unsupported_return_value!(bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

/// The full return type of a handler.
pub trait Reply: 'static {
    /// Kinds of the returned values, in order.
    fn shape() -> Vec<ReturnKind>;

    fn into_outcome(self) -> Outcome;
}

impl Reply for () {
    fn shape() -> Vec<ReturnKind> {
        Vec::new()
    }

    fn into_outcome(self) -> Outcome {
        Outcome::Done
    }
}

impl<T, E> Reply for Result<T, E>
where
    T: ReturnValue,
    E: Into<BoxError> + 'static,
{
    fn shape() -> Vec<ReturnKind> {
        if T::KIND == ReturnKind::Unit {
            vec![ReturnKind::Error]
        } else {
            vec![T::KIND, ReturnKind::Error]
        }
    }

    fn into_outcome(self) -> Outcome {
        match self {
            Ok(_) if T::KIND == ReturnKind::Unit => Outcome::Done,
            Ok(value) => Outcome::Payload(value.into_payload()),
            Err(err) => Outcome::Failed(err.into()),
        }
    }
}

impl<A: ReturnValue, B: ReturnValue> Reply for (A, B) {
    fn shape() -> Vec<ReturnKind> {
        vec![A::KIND, B::KIND]
    }

    fn into_outcome(self) -> Outcome {
        Outcome::Invalid
    }
}

impl<A: ReturnValue, B: ReturnValue, C: ReturnValue> Reply for (A, B, C) {
    fn shape() -> Vec<ReturnKind> {
        vec![A::KIND, B::KIND, C::KIND]
    }

    fn into_outcome(self) -> Outcome {
        Outcome::Invalid
    }
}

macro_rules! bare_reply {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Reply for $ty {
                fn shape() -> Vec<ReturnKind> {
                    vec![<$ty as ReturnValue>::KIND]
                }

                fn into_outcome(self) -> Outcome {
                    Outcome::Invalid
                }
            }
        )*
    };
}

bare_reply!(
    String, &'static str, Vec<u8>, Bytes, serde_json::Value, bool, char, i8, i16, i32, i64, i128,
    isize, u8, u16, u32, u64, u128, usize, f32, f64,
);

impl<T: Serialize + 'static> Reply for Json<T> {
    fn shape() -> Vec<ReturnKind> {
        vec![ReturnKind::Json]
    }

    fn into_outcome(self) -> Outcome {
        Outcome::Invalid
    }
}

impl<T: Serialize + 'static> Reply for Option<Json<T>> {
    fn shape() -> Vec<ReturnKind> {
        vec![ReturnKind::Json]
    }

    fn into_outcome(self) -> Outcome {
        Outcome::Invalid
    }
}
