//! Named constants for the single-character packet types.

/// Login request (client to server).
pub const LOGIN_REQUEST: u8 = b'L';
/// Login accepted (server to client).
pub const LOGIN_ACCEPT: u8 = b'A';
/// Login rejected (server to client).
pub const LOGIN_REJECT: u8 = b'J';
/// Server heartbeat.
pub const SERVER_HEARTBEAT: u8 = b'H';
/// Client heartbeat.
pub const CLIENT_HEARTBEAT: u8 = b'R';
/// Sequenced data (server to client).
pub const SEQUENCED_DATA: u8 = b'S';
/// Unsequenced data (client to server).
pub const UNSEQUENCED_DATA: u8 = b'U';
/// Debug text, either direction.
pub const DEBUG_TEXT: u8 = b'+';
/// Logout (client to server).
pub const LOGOUT: u8 = b'O';

/// Login rejection reason: not authorized. The only reason this crate emits.
pub const REJECT_NOT_AUTHORIZED: u8 = b'A';
