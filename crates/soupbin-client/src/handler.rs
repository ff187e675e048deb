//! Application-level client handler: logs sequenced messages as they
//! arrive.

use bytes::Bytes;
use tracing::info;

use soupbin_core::handler::ClientHandler;

/// Logs every sequenced message it receives. The interesting logic lives in
/// the REPL that drives logout/debug/unsequenced commands via a
/// [`soupbin_core::session::ClientHandle`].
#[derive(Debug, Default)]
pub struct LoggingClientHandler;

impl ClientHandler for LoggingClientHandler {
    fn process_sequenced(&mut self, body: &Bytes) {
        info!(message = %String::from_utf8_lossy(body), "sequenced message received");
    }
}
