//! Mapping from a handler's return shape to a response strategy.

use super::error::RegistrationError;
use super::reply::ReturnKind;

/// How a handler's result becomes the response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// Write the success status, no body.
    NoResponse,
    /// An error, or the success status.
    ErrorOnly,
    /// Text body, 204 when empty.
    Text,
    /// Byte body, 204 when empty.
    Bytes,
    /// JSON body, 204 when null.
    Json,
}

impl Strategy {
    /// Whether a successful call produces a body.
    pub fn has_body(&self) -> bool {
        matches!(self, Strategy::Text | Strategy::Bytes | Strategy::Json)
    }
}

/// Pick the strategy for a return shape.
pub(crate) fn classify(
    shape: &[ReturnKind],
    writes_response: bool,
) -> Result<Strategy, RegistrationError> {
    match shape {
        [] => Ok(Strategy::NoResponse),
        [ReturnKind::Error] => Ok(Strategy::ErrorOnly),
        [_] => Err(RegistrationError::ExpectErrorType),
        [_, _] if writes_response => Err(RegistrationError::WriteAndReturn),
        [_, second] if *second != ReturnKind::Error => Err(RegistrationError::ExpectErrorType),
        [first, _] => match first {
            ReturnKind::Text => Ok(Strategy::Text),
            ReturnKind::Bytes => Ok(Strategy::Bytes),
            ReturnKind::Json => Ok(Strategy::Json),
            ReturnKind::Unsupported(name) => Err(RegistrationError::UnsupportedReturnType(name)),
            ReturnKind::Unit => Err(RegistrationError::UnsupportedReturnType("()")),
            ReturnKind::Error => Err(RegistrationError::UnsupportedReturnType("error")),
        },
        _ => Err(RegistrationError::InvalidReturnCount(shape.len())),
    }
}
