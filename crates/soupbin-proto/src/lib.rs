//! Wire-level framing and login payload codecs.
//!
//! This crate has no knowledge of sessions, storage, or networking: it only
//! turns packet types and bodies into bytes and back.

mod errors;
mod frame;
mod login;
pub mod packet_type;

pub use errors::{LoginParseError, ProtocolError, Result};
pub use frame::Frame;
pub use login::{LoginAccept, LoginRequest};
