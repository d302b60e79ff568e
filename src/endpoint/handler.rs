//! Handler functions of any arity.

use std::any::Any;
use std::marker::PhantomData;

use thiserror::Error;

use super::reply::{Outcome, Reply};
use crate::binding::{downcast, ArgType, Value};

/// A handler was called with values that do not match its signature.
///
/// Registration checks make this unreachable for well-formed endpoints; it
/// surfaces as a 500 "invalid API construction".
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvocationError {
    #[error("argument value is not a {0}")]
    Downcast(&'static str),

    #[error("handler called with too few arguments")]
    Missing,

    #[error("return value does not match the endpoint's response strategy")]
    UnexpectedReturn,
}

/// A handler panicked while serving a request.
///
/// Reported to the logger like any other non-API error; the client gets a
/// 500 "unknown".
#[derive(Debug, Error, PartialEq, Eq)]
#[error("handler panicked: {0}")]
pub struct HandlerPanic(pub String);

impl HandlerPanic {
    pub fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self(message)
    }
}

/// A function usable as an endpoint handler.
///
/// Implemented for every `Fn(A1, .., An) -> R` with `n <= 12`, where each
/// argument type is `'static` and `R` is a [`Reply`].
pub trait Handler<Args>: Send + Sync + 'static {
    type Output: Reply;

    /// Parameter types, in order.
    fn signature() -> Vec<ArgType>;

    /// Call with type-erased arguments.
    fn call(&self, args: Vec<Value>) -> Result<Self::Output, InvocationError>;
}

macro_rules! impl_handler {
    ($($ty:ident),*) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, R, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> R + Send + Sync + 'static,
            R: Reply,
            $($ty: 'static,)*
        {
            type Output = R;

            fn signature() -> Vec<ArgType> {
                vec![$(ArgType::of::<$ty>()),*]
            }

            fn call(&self, args: Vec<Value>) -> Result<R, InvocationError> {
                let mut args = args.into_iter();
                $(
                    let $ty = downcast::<$ty>(args.next().ok_or(InvocationError::Missing)?)?;
                )*
                Ok((self)($($ty),*))
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12);

/// Object-safe view of a handler.
pub(crate) trait Invoke: Send + Sync {
    fn invoke(&self, args: Vec<Value>) -> Result<Outcome, InvocationError>;
}

pub(crate) struct HandlerFn<H, A> {
    handler: H,
    _args: PhantomData<fn() -> A>,
}

impl<H, A> HandlerFn<H, A> {
    pub(crate) fn new(handler: H) -> Self {
        Self {
            handler,
            _args: PhantomData,
        }
    }
}

impl<H, A> Invoke for HandlerFn<H, A>
where
    H: Handler<A>,
    A: 'static,
{
    fn invoke(&self, args: Vec<Value>) -> Result<Outcome, InvocationError> {
        Ok(self.handler.call(args)?.into_outcome())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature_of<H: Handler<A>, A>(_: &H) -> Vec<ArgType> {
        H::signature()
    }

    #[test]
    fn test_signature() {
        let h = |_a: String, _b: i64, _c: Vec<u8>| {};
        assert_eq!(
            signature_of(&h),
            vec![
                ArgType::of::<String>(),
                ArgType::of::<i64>(),
                ArgType::of::<Vec<u8>>()
            ]
        );
        assert!(signature_of(&|| {}).is_empty());
    }

    #[test]
    fn test_call_with_erased_args() {
        let h = |a: String, b: i64| -> Result<String, crate::core::BoxError> {
            Ok(format!("{a}{b}"))
        };
        let args = vec![Box::new("n".to_string()) as Value, Box::new(5i64)];
        let out = Handler::call(&h, args).unwrap();
        assert_eq!(out.unwrap(), "n5");
    }

    #[test]
    fn test_call_mismatch() {
        let h = |_a: String| {};
        assert_eq!(
            Handler::call(&h, vec![Box::new(1u8) as Value]).unwrap_err(),
            InvocationError::Downcast("alloc::string::String")
        );
        assert_eq!(
            Handler::call(&h, vec![]).unwrap_err(),
            InvocationError::Missing
        );
    }

    #[test]
    fn test_panic_payload_message() {
        let payload = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(HandlerPanic::from_payload(payload.as_ref()).0, "boom");

        let payload = std::panic::catch_unwind(|| panic!("code {}", 7)).unwrap_err();
        assert_eq!(
            HandlerPanic::from_payload(payload.as_ref()).to_string(),
            "handler panicked: code 7"
        );
    }

    #[test]
    fn test_erased_invoke() {
        let handler = || -> Result<(), std::io::Error> { Ok(()) };
        let invoke: Box<dyn Invoke> = Box::new(HandlerFn::<_, ()>::new(handler));
        assert!(matches!(invoke.invoke(vec![]).unwrap(), Outcome::Done));
    }
}
