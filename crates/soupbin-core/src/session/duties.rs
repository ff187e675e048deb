//! The shared engine behind both session roles: the send queue, the
//! transient writer, the reader, and the two timers, all reporting into one
//! event channel so the owning task is the only place session state is ever
//! touched.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use soupbin_proto::{Frame, ProtocolError};

use crate::env::Environment;
use crate::error::SessionError;
use crate::storage::{SessionLog, Storage};

use super::timer::{self, ResettableTimer};

/// Heartbeat production cadence.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);
/// Inactivity death timeout.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(15);

/// Why the reader duty stopped.
#[derive(Debug)]
pub enum ReaderOutcome {
    /// The peer closed the connection cleanly.
    Eof,
    /// A framing error was detected.
    Protocol(ProtocolError),
    /// The socket read failed.
    Io(std::io::Error),
}

/// Everything the serialization domain's run loop can observe.
pub enum DutyEvent {
    /// A complete frame was decoded.
    Frame {
        /// The packet-type byte.
        packet_type: u8,
        /// Body bytes, not including the packet-type byte.
        body: Bytes,
    },
    /// The reader duty exited.
    ReaderStopped(ReaderOutcome),
    /// The heartbeat timer fired naturally.
    HeartbeatDue,
    /// The inactivity timer fired naturally.
    InactivityDue,
    /// The writer duty drained the queue and is handing the write half back.
    WriterDrained(OwnedWriteHalf),
    /// The writer duty hit an IO error mid-frame.
    WriterFailed(std::io::Error),
}

/// The engine shared by [`super::server::ServerSession`] and
/// [`super::client::ClientSession`].
pub struct Core<S: Storage, E: Environment> {
    pub(crate) events: mpsc::UnboundedReceiver<DutyEvent>,
    events_tx: mpsc::UnboundedSender<DutyEvent>,
    queue: Arc<StdMutex<VecDeque<Bytes>>>,
    write_half: Option<OwnedWriteHalf>,
    writer_task: Option<AbortHandle>,
    reader_task: AbortHandle,
    heartbeat: ResettableTimer<E>,
    heartbeat_task: AbortHandle,
    inactivity: ResettableTimer<E>,
    inactivity_task: AbortHandle,
    pub(crate) log: SessionLog<S>,
    pub(crate) env: E,
    pub(crate) sequence: u64,
    pub(crate) session_name: Option<String>,
}

impl<S: Storage, E: Environment> Core<S, E> {
    /// Split `stream` into its halves and start the reader and both timers.
    /// The caller drives the event loop by awaiting `events.recv()`.
    pub fn spawn(stream: tokio::net::TcpStream, storage: S, env: E) -> Self {
        let (read_half, write_half) = stream.into_split();
        let (events_tx, events) = mpsc::unbounded_channel();

        let reader_tx = events_tx.clone();
        let reader_task = tokio::spawn(run_reader(read_half, reader_tx)).abort_handle();

        let heartbeat_tx = events_tx.clone();
        let (heartbeat, heartbeat_task) = timer::spawn(env.clone(), HEARTBEAT_INTERVAL, move || {
            heartbeat_tx.send(DutyEvent::HeartbeatDue).is_ok()
        });

        let inactivity_tx = events_tx.clone();
        let (inactivity, inactivity_task) = timer::spawn(env.clone(), IDLE_TIMEOUT, move || {
            inactivity_tx.send(DutyEvent::InactivityDue).is_ok()
        });

        Self {
            events,
            events_tx,
            queue: Arc::new(StdMutex::new(VecDeque::new())),
            write_half: Some(write_half),
            writer_task: None,
            reader_task,
            heartbeat,
            heartbeat_task,
            inactivity,
            inactivity_task,
            log: SessionLog::unopened(storage),
            env,
            sequence: 0,
            session_name: None,
        }
    }

    /// Reset the inactivity timer; called on every received frame and
    /// explicitly on peer-heartbeat receipt (the two are the same action,
    /// since a heartbeat is itself a received frame).
    pub fn touch_activity(&self) {
        self.inactivity.reset(&self.env, IDLE_TIMEOUT);
    }

    /// Encode `(packet_type, body)` and enqueue it; spawn the writer duty if
    /// the queue just transitioned from empty to non-empty. This is the only
    /// producer of queue entries and never awaits.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Framing`] if the payload exceeds the wire's
    /// 16-bit length field.
    pub fn dispatch(&mut self, packet_type: u8, body: &[u8]) -> Result<(), SessionError> {
        let frame = Frame::new(packet_type, Bytes::copy_from_slice(body));
        let wire = frame.encode()?;

        let became_non_empty = {
            #[allow(clippy::expect_used)]
            let mut queue = self.queue.lock().expect("invariant: queue mutex is never held across await");
            queue.push_back(wire);
            queue.len() == 1
        };

        if became_non_empty {
            self.try_spawn_writer();
        }

        Ok(())
    }

    /// Spawn the writer if the write half is currently idle (owned by the
    /// session rather than a running writer task). If the write half is out
    /// with a still-draining writer, that writer will notice the queue is
    /// non-empty when it hands the half back (see `on_writer_drained`).
    fn try_spawn_writer(&mut self) {
        let Some(write_half) = self.write_half.take() else {
            return;
        };
        let queue = Arc::clone(&self.queue);
        let events_tx = self.events_tx.clone();
        self.writer_task = Some(tokio::spawn(run_writer(write_half, queue, events_tx)).abort_handle());
    }

    /// Handle the writer duty handing the write half back after draining.
    /// If frames arrived while it was draining, respawn immediately;
    /// otherwise the queue is empty and the heartbeat timer is rearmed.
    ///
    /// Returns `true` iff the queue ended up empty (no respawn happened), so
    /// callers waiting to close only after their last dispatched frame is on
    /// the wire know when that has happened.
    pub fn on_writer_drained(&mut self, write_half: OwnedWriteHalf) -> bool {
        self.writer_task = None;
        self.write_half = Some(write_half);

        #[allow(clippy::expect_used)]
        let queue_is_empty =
            self.queue.lock().expect("invariant: queue mutex is never held across await").is_empty();

        if queue_is_empty {
            self.heartbeat.reset(&self.env, HEARTBEAT_INTERVAL);
        } else {
            self.try_spawn_writer();
        }

        queue_is_empty
    }

    /// Cancel both timers and the reader, and shut the socket down both
    /// ways. Consumes the engine; called once, at the end of the run loop.
    pub async fn shutdown(mut self) {
        self.heartbeat_task.abort();
        self.inactivity_task.abort();
        self.reader_task.abort();
        if let Some(task) = self.writer_task.take() {
            task.abort();
        }
        if let Some(mut write_half) = self.write_half.take() {
            if let Err(error) = write_half.shutdown().await {
                debug!(%error, "socket shutdown failed (peer likely already gone)");
            }
        }
    }
}

async fn run_reader(mut read_half: OwnedReadHalf, events_tx: mpsc::UnboundedSender<DutyEvent>) {
    loop {
        let mut length_buf = [0u8; 2];
        if let Err(error) = read_half.read_exact(&mut length_buf).await {
            let outcome = if error.kind() == std::io::ErrorKind::UnexpectedEof {
                ReaderOutcome::Eof
            } else {
                ReaderOutcome::Io(error)
            };
            let _ = events_tx.send(DutyEvent::ReaderStopped(outcome));
            return;
        }

        let length = match Frame::decode_length(length_buf) {
            Ok(length) => length,
            Err(error) => {
                let _ = events_tx.send(DutyEvent::ReaderStopped(ReaderOutcome::Protocol(error)));
                return;
            },
        };

        let mut payload = vec![0u8; length as usize];
        if let Err(error) = read_half.read_exact(&mut payload).await {
            let outcome = if error.kind() == std::io::ErrorKind::UnexpectedEof {
                ReaderOutcome::Eof
            } else {
                ReaderOutcome::Io(error)
            };
            let _ = events_tx.send(DutyEvent::ReaderStopped(outcome));
            return;
        }

        #[allow(clippy::indexing_slicing)]
        let packet_type = payload[0];
        #[allow(clippy::indexing_slicing)]
        let body = Bytes::copy_from_slice(&payload[1..]);

        if events_tx.send(DutyEvent::Frame { packet_type, body }).is_err() {
            return;
        }
    }
}

async fn run_writer(
    mut write_half: OwnedWriteHalf,
    queue: Arc<StdMutex<VecDeque<Bytes>>>,
    events_tx: mpsc::UnboundedSender<DutyEvent>,
) {
    loop {
        #[allow(clippy::expect_used)]
        let next = { queue.lock().expect("invariant: queue mutex is never held across await").pop_front() };

        let Some(wire) = next else {
            let _ = events_tx.send(DutyEvent::WriterDrained(write_half));
            return;
        };

        if let Err(error) = write_half.write_all(&wire).await {
            warn!(%error, "writer duty failed mid-frame");
            let _ = events_tx.send(DutyEvent::WriterFailed(error));
            return;
        }
    }
}
