use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use crate::endpoint::BuildError;

/// Errors that stop the server from starting or serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid API: {0}")]
    Build(#[from] BuildError),

    #[error("failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    #[error("listener error: {0}")]
    Io(#[from] io::Error),
}
