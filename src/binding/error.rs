//! Declaration errors for argument providers.

use thiserror::Error;

/// A provider cannot bind to the parameter it was declared for, or the
/// declaration itself is malformed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParamError {
    #[error("expected a string type, found {0}")]
    ExpectedString(&'static str),

    #[error("expected a byte slice, found {0}")]
    ExpectedByteSlice(&'static str),

    #[error("expected a body reader, found {0}")]
    ExpectedReader(&'static str),

    #[error("argument's type must be {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("invalid type of request_struct: {0}")]
    InvalidRequestStruct(&'static str),

    #[error("unsupported tag {0:?}")]
    UnsupportedTag(String),

    #[error("tag {0:?} requires a value")]
    MissingTagValue(String),

    #[error("json_body field must be declared with Field::json")]
    MissingDecoder,

    #[error("request_struct field must be declared with Field::nested")]
    MissingNestedStruct,

    #[error("only one struct field can read request's body")]
    MultipleBodyReaders,

    #[error("requires an argument param")]
    RequiresArgument,

    #[error("(struct field {field}) {source}")]
    Field {
        field: &'static str,
        source: Box<ParamError>,
    },

    #[error("(as int) {0}")]
    AsInt(Box<ParamError>),

    #[error("(as byte slice) {0}")]
    AsByteSlice(Box<ParamError>),
}

impl ParamError {
    pub(crate) fn in_field(self, field: &'static str) -> Self {
        ParamError::Field {
            field,
            source: Box::new(self),
        }
    }
}
