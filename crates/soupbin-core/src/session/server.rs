//! Server-side session role.

use std::net::SocketAddr;

use tokio::net::TcpStream;
use tracing::{info, info_span, warn, Instrument};

use soupbin_proto::packet_type;

use crate::env::Environment;
use crate::error::SessionError;
use crate::handler::{ServerHandler, ServerOps};
use crate::storage::Storage;

use super::duties::{Core, DutyEvent, ReaderOutcome};

/// A live server-side session: the session core bound to a connected socket
/// and a [`ServerHandler`] implementation.
pub struct ServerSession<S: Storage, E: Environment, H: ServerHandler<S, E>> {
    core: Core<S, E>,
    handler: H,
    peer_addr: SocketAddr,
}

impl<S: Storage, E: Environment, H: ServerHandler<S, E>> ServerSession<S, E, H> {
    /// Build a session over an already-accepted connection. The session is
    /// unauthenticated until a successful `L` handshake.
    pub fn new(stream: TcpStream, peer_addr: SocketAddr, storage: S, env: E, handler: H) -> Self {
        Self { core: Core::spawn(stream, storage, env), handler, peer_addr }
    }

    /// Drive the session to completion: processes frames until logout, the
    /// peer disconnecting after a login rejection, inactivity timeout, or an
    /// IO / framing error, then shuts the socket down both ways.
    pub async fn run(mut self) {
        let span = info_span!("server_session", peer = %self.peer_addr, session = tracing::field::Empty);
        async move {
            loop {
                let Some(event) = self.core.events.recv().await else {
                    break;
                };

                match event {
                    DutyEvent::Frame { packet_type, body } => {
                        self.core.touch_activity();
                        if self.handle_frame(packet_type, &body) {
                            break;
                        }
                    },
                    DutyEvent::ReaderStopped(outcome) => {
                        log_reader_outcome(&outcome);
                        break;
                    },
                    DutyEvent::HeartbeatDue => {
                        if let Err(error) = self.core.dispatch(packet_type::SERVER_HEARTBEAT, b"") {
                            warn!(%error, "failed to dispatch heartbeat");
                            break;
                        }
                    },
                    DutyEvent::InactivityDue => {
                        info!("inactivity timeout, closing session");
                        break;
                    },
                    DutyEvent::WriterDrained(write_half) => {
                        self.core.on_writer_drained(write_half);
                    },
                    DutyEvent::WriterFailed(error) => {
                        warn!(%error, "writer duty failed, closing session");
                        break;
                    },
                }
            }

            self.core.shutdown().await;
        }
        .instrument(span)
        .await;
    }

    /// Returns `true` if the session should stop.
    fn handle_frame(&mut self, packet_type: u8, body: &[u8]) -> bool {
        match packet_type {
            packet_type::LOGIN_REQUEST => {
                let mut ops = ServerOps { core: &mut self.core };
                self.handler.process_login(&mut ops, body);
                false
            },
            packet_type::UNSEQUENCED_DATA => {
                let mut ops = ServerOps { core: &mut self.core };
                self.handler.process_unsequenced(&mut ops, body);
                false
            },
            packet_type::CLIENT_HEARTBEAT => false,
            packet_type::DEBUG_TEXT => {
                tracing::debug!(body = %String::from_utf8_lossy(body), "debug frame");
                false
            },
            packet_type::SEQUENCED_DATA => false,
            packet_type::LOGOUT => {
                info!("client logged out");
                true
            },
            other => {
                warn!(packet_type = other, "unknown packet type, ignoring");
                false
            },
        }
    }
}

fn log_reader_outcome(outcome: &ReaderOutcome) {
    match outcome {
        ReaderOutcome::Eof => info!("client closed the connection"),
        ReaderOutcome::Protocol(error) => warn!(%error, "framing error"),
        ReaderOutcome::Io(error) => warn!(%error, "socket read failed"),
    }
}

/// Surface a storage error from the session log as a reject, matching the
/// error-handling design's policy of reject-on-storage-failure for the login
/// path.
pub fn reject_on_error<S: Storage, E: Environment>(
    ops: &mut ServerOps<'_, S, E>,
    result: Result<(), SessionError>,
) {
    if let Err(error) = result {
        warn!(%error, "login path failed, rejecting");
        let _ = ops.reject_login(packet_type::REJECT_NOT_AUTHORIZED);
    }
}
