//! Registration errors.

use std::error::Error as StdError;
use std::fmt;

use http::Method;
use thiserror::Error;

use crate::binding::ParamError;

/// An endpoint or route could not be registered.
#[derive(Clone, Debug, Error)]
pub enum RegistrationError {
    #[error("number of arguments of a function doesn't match provided arguments (expected {expected}, got {got})")]
    ArgumentCount { expected: usize, got: usize },

    #[error("(argument {index}) {source}")]
    Argument { index: usize, source: ParamError },

    #[error("(param {index}) {source}")]
    Param { index: usize, source: ParamError },

    #[error("only one argument can read request's body")]
    MultipleBodyReaders,

    #[error("expect an error type in return arguments")]
    ExpectErrorType,

    #[error("cannot write response and return response")]
    WriteAndReturn,

    #[error("unsupported return type {0}")]
    UnsupportedReturnType(&'static str),

    #[error("invalid number of return arguments: {0}")]
    InvalidReturnCount(usize),

    #[error("endpoint {pattern}: {source}")]
    Endpoint {
        pattern: String,
        source: Box<RegistrationError>,
    },

    #[error("route {pattern}: {source}")]
    Route {
        pattern: String,
        source: Box<RegistrationError>,
    },

    #[error("{pattern}: {source}")]
    Conflict {
        pattern: String,
        source: matchit::InsertError,
    },

    #[error("endpoint {method} {pattern} is already registered")]
    DuplicateEndpoint { method: Method, pattern: String },
}

impl RegistrationError {
    pub(crate) fn in_endpoint(self, pattern: &str) -> Self {
        RegistrationError::Endpoint {
            pattern: pattern.to_string(),
            source: Box::new(self),
        }
    }

    pub(crate) fn in_route(self, pattern: &str) -> Self {
        RegistrationError::Route {
            pattern: pattern.to_string(),
            source: Box::new(self),
        }
    }
}

/// Every registration error of a route tree.
#[derive(Debug)]
pub struct BuildError(Vec<RegistrationError>);

impl BuildError {
    pub(crate) fn new(errors: Vec<RegistrationError>) -> Self {
        Self(errors)
    }

    pub fn errors(&self) -> &[RegistrationError] {
        &self.0
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl StdError for BuildError {}
