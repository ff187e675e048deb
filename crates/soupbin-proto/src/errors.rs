//! Error types for the wire-level codecs.

use thiserror::Error;

/// Failures that can occur while framing or parsing protocol bytes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Fewer bytes were available than the frame's length prefix promised.
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Bytes the length prefix claimed.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// A frame declared a length of zero, which is never valid.
    #[error("frame length is zero")]
    EmptyPayload,

    /// The payload (packet type plus body) exceeds the 16-bit length field.
    #[error("payload too large: {size} bytes exceeds max {max}")]
    PayloadTooLarge {
        /// Requested payload size.
        size: usize,
        /// Maximum payload size representable on the wire.
        max: usize,
    },
}

/// Failures parsing a login request or login-accept body.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoginParseError {
    /// The body was not exactly the expected fixed width.
    #[error("login body has wrong length: expected {expected}, got {actual}")]
    WrongLength {
        /// Expected body length.
        expected: usize,
        /// Actual body length.
        actual: usize,
    },

    /// The sequence field did not parse as a base-10 integer.
    #[error("sequence field is not a valid base-10 integer")]
    InvalidSequence,
}

/// Convenience alias for codec results.
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;
