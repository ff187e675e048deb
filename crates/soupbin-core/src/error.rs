//! Session-level error type, unifying the lower-level error kinds from the
//! protocol, storage, and authentication layers.

use thiserror::Error;

use soupbin_proto::{LoginParseError, ProtocolError};

use crate::storage::StorageError;

/// Errors the session core distinguishes, matching the error-handling design.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Bad length prefix or short read while decoding a frame.
    #[error("framing error: {0}")]
    Framing(#[from] ProtocolError),

    /// Socket read or write failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The durable log failed to open, append, or scan.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A login field could not be parsed.
    #[error("login parse error: {0}")]
    Parse(#[from] LoginParseError),

    /// The authenticator rejected the login.
    #[error("authentication rejected")]
    Auth,

    /// The inactivity timer fired.
    #[error("inactivity timeout")]
    Timeout,
}
