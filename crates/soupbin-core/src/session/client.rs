//! Client-side session role.

use bytes::Bytes;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{info, info_span, warn, Instrument};

use soupbin_proto::{packet_type, LoginRequest};

use crate::env::Environment;
use crate::error::SessionError;
use crate::handler::ClientHandler;
use crate::storage::Storage;

use super::duties::{Core, DutyEvent, ReaderOutcome};

/// A command sent from an external driver (typically a REPL) into a running
/// [`ClientSession`]. The session loop is the only place allowed to touch
/// the session core, so commands cross this channel instead.
pub enum ClientCommand {
    /// Send an `U` frame.
    Unsequenced(Vec<u8>),
    /// Send a `+` frame.
    Debug(Vec<u8>),
    /// Send an `O` frame and end the session once it has been flushed.
    Logout,
}

/// A handle used by an external driver to send commands into a running
/// session without owning it.
#[derive(Clone)]
pub struct ClientHandle {
    commands: mpsc::UnboundedSender<ClientCommand>,
}

impl ClientHandle {
    /// Queue an unsequenced application message.
    pub fn send_unsequenced(&self, body: Vec<u8>) {
        let _ = self.commands.send(ClientCommand::Unsequenced(body));
    }

    /// Queue a debug-text message.
    pub fn send_debug(&self, body: Vec<u8>) {
        let _ = self.commands.send(ClientCommand::Debug(body));
    }

    /// Queue a logout; the session ends once it has drained to the wire.
    pub fn send_logout(&self) {
        let _ = self.commands.send(ClientCommand::Logout);
    }
}

/// A live client-side session: the session core bound to a connected socket,
/// its durable input log, and a [`ClientHandler`] implementation.
pub struct ClientSession<S: Storage, E: Environment, H: ClientHandler> {
    core: Core<S, E>,
    handler: H,
    commands: mpsc::UnboundedReceiver<ClientCommand>,
    pending_close: bool,
}

impl<S: Storage, E: Environment, H: ClientHandler> ClientSession<S, E, H> {
    /// Connect to `addr`, open the session's durable input log, and send the
    /// initial `L` frame requesting replay from one past the last sequence
    /// this client has durably recorded.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if the connection fails, or
    /// [`SessionError::Storage`] if the log cannot be opened.
    pub async fn connect(
        addr: &str,
        username: &str,
        password: &str,
        session_name: &str,
        storage: S,
        env: E,
        handler: H,
    ) -> Result<(Self, ClientHandle), SessionError> {
        let stream = TcpStream::connect(addr).await?;
        let mut core = Core::spawn(stream, storage, env);

        core.log.open_as(format!("client-{username}-{session_name}"))?;
        let last_sequence = core.log.load_input()?.into_iter().map(|entry| entry.sequence).max().unwrap_or(0);
        core.sequence = last_sequence + 1;
        core.session_name = Some(session_name.to_string());

        let login = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
            session_name: session_name.to_string(),
            sequence: core.sequence,
        };
        core.dispatch(packet_type::LOGIN_REQUEST, &login.encode())?;

        let (commands_tx, commands) = mpsc::unbounded_channel();
        let session = Self { core, handler, commands, pending_close: false };
        Ok((session, ClientHandle { commands: commands_tx }))
    }

    /// Drive the session until logout completes, the server rejects the
    /// login, the connection drops, or an inactivity timeout fires.
    pub async fn run(mut self) {
        let span = info_span!("client_session", session = self.core.session_name.clone().unwrap_or_default());
        async move {
            loop {
                tokio::select! {
                    event = self.core.events.recv() => {
                        let Some(event) = event else { break };
                        if self.handle_event(event) {
                            break;
                        }
                    }
                    command = self.commands.recv(), if !self.pending_close => {
                        let Some(command) = command else { continue };
                        self.handle_command(command);
                    }
                }
            }

            self.core.shutdown().await;
        }
        .instrument(span)
        .await;
    }

    /// Returns `true` if the session should stop.
    fn handle_event(&mut self, event: DutyEvent) -> bool {
        match event {
            DutyEvent::Frame { packet_type, body } => {
                self.core.touch_activity();
                self.handle_frame(packet_type, body)
            },
            DutyEvent::ReaderStopped(outcome) => {
                log_reader_outcome(&outcome);
                true
            },
            DutyEvent::HeartbeatDue => {
                if let Err(error) = self.core.dispatch(packet_type::CLIENT_HEARTBEAT, b"") {
                    warn!(%error, "failed to dispatch heartbeat");
                    return true;
                }
                false
            },
            DutyEvent::InactivityDue => {
                info!("inactivity timeout, closing session");
                true
            },
            DutyEvent::WriterDrained(write_half) => {
                let queue_is_empty = self.core.on_writer_drained(write_half);
                queue_is_empty && self.pending_close
            },
            DutyEvent::WriterFailed(error) => {
                warn!(%error, "writer duty failed, closing session");
                true
            },
        }
    }

    fn handle_frame(&mut self, packet_type: u8, body: Bytes) -> bool {
        match packet_type {
            packet_type::LOGIN_ACCEPT => {
                info!("login accepted");
                false
            },
            packet_type::LOGIN_REJECT => {
                warn!("login rejected");
                true
            },
            packet_type::SEQUENCED_DATA => {
                if let Err(error) = self.core.log.store_input(&body) {
                    warn!(%error, "failed to persist sequenced message");
                    return true;
                }
                self.core.sequence += 1;
                self.handler.process_sequenced(&body);
                false
            },
            packet_type::SERVER_HEARTBEAT | packet_type::UNSEQUENCED_DATA => false,
            packet_type::DEBUG_TEXT => {
                tracing::debug!(body = %String::from_utf8_lossy(&body), "debug frame");
                false
            },
            other => {
                warn!(packet_type = other, "unknown packet type, ignoring");
                false
            },
        }
    }

    fn handle_command(&mut self, command: ClientCommand) {
        let result = match command {
            ClientCommand::Unsequenced(body) => self.core.dispatch(packet_type::UNSEQUENCED_DATA, &body),
            ClientCommand::Debug(body) => self.core.dispatch(packet_type::DEBUG_TEXT, &body),
            ClientCommand::Logout => {
                self.pending_close = true;
                self.core.dispatch(packet_type::LOGOUT, b"")
            },
        };
        if let Err(error) = result {
            warn!(%error, "failed to dispatch command");
        }
    }
}

fn log_reader_outcome(outcome: &ReaderOutcome) {
    match outcome {
        ReaderOutcome::Eof => info!("server closed the connection"),
        ReaderOutcome::Protocol(error) => warn!(%error, "framing error"),
        ReaderOutcome::Io(error) => warn!(%error, "socket read failed"),
    }
}
