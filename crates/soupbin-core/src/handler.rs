//! Handler capability sets and the server-side session operations they're
//! given to invoke accept/reject/replay with.

use bytes::Bytes;
use soupbin_proto::packet_type;

use crate::env::Environment;
use crate::error::SessionError;
use crate::session::duties::Core;
use crate::storage::Storage;

/// Session operations exposed to the server handler: accept, reject,
/// replay, and send sequenced application data.
pub struct ServerOps<'a, S: Storage, E: Environment> {
    pub(crate) core: &'a mut Core<S, E>,
}

impl<S: Storage, E: Environment> ServerOps<'_, S, E> {
    /// Current wall-clock time as seconds since the Unix epoch, taken from
    /// the session's [`Environment`] rather than the system clock directly,
    /// so handlers stay deterministically testable.
    pub fn wall_clock_secs(&self) -> u64 {
        self.core.env.wall_clock_secs()
    }

    /// Persist `body` to the output log, assigning the next sequence, then
    /// enqueue it as an `S` frame. Durable-before-send: the store completes
    /// before the frame is queued.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] if the append fails, or
    /// [`SessionError::Framing`] if the body is too large to frame.
    pub fn send_sequenced(&mut self, body: &[u8]) -> Result<u64, SessionError> {
        let sequence = self.core.log.store_output(body)?;
        self.core.sequence = sequence;
        self.core.dispatch(packet_type::SEQUENCED_DATA, body)?;
        Ok(sequence)
    }

    /// Enqueue a `J` (login reject) frame with the given single-byte reason.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Framing`] on encode failure (never happens for
    /// a one-byte body, but the signature stays consistent with the rest of
    /// the API).
    pub fn reject_login(&mut self, reason: u8) -> Result<(), SessionError> {
        self.core.dispatch(packet_type::LOGIN_REJECT, &[reason])
    }

    /// Record the accepted session name and open its durable output log.
    /// Must be called before [`Self::next_output_sequence`] or
    /// [`Self::send_login_accept`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] if the log cannot be opened.
    pub fn open_session(&mut self, session_name: &str) -> Result<(), SessionError> {
        self.core.session_name = Some(session_name.to_string());
        self.core.log.open_as(format!("server-{session_name}"))?;
        Ok(())
    }

    /// The sequence that will be assigned to the next [`Self::send_sequenced`]
    /// call: one past the highest sequence already durably stored in the
    /// output log, or `1` if the log is empty. This is the value the `A`
    /// frame's body must report, not the sequence the client requested.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] if the scan fails.
    pub fn next_output_sequence(&self) -> Result<u64, SessionError> {
        let highest = self.core.log.load_output(0)?.into_iter().map(|entry| entry.sequence).max();
        Ok(highest.map_or(1, |sequence| sequence + 1))
    }

    /// Enqueue an `A` (login accepted) frame with the given body. The
    /// session's output log must already be open (see [`Self::open_session`]).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Framing`] on encode failure.
    pub fn send_login_accept(&mut self, body: &[u8]) -> Result<(), SessionError> {
        self.core.dispatch(packet_type::LOGIN_ACCEPT, body)
    }

    /// Replay every output row with `sequence >= from`, in order, each as an
    /// `S` frame. Updates the session's sequence bookkeeping as it goes.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] if the scan fails.
    pub fn replay_sequenced(&mut self, from: u64) -> Result<(), SessionError> {
        for entry in self.core.log.load_output(from)? {
            self.core.sequence = entry.sequence;
            self.core.dispatch(packet_type::SEQUENCED_DATA, &entry.body)?;
        }
        Ok(())
    }
}

/// Processes login (via an `Authenticator` the implementation holds) and
/// unsequenced application messages.
pub trait ServerHandler<S: Storage, E: Environment>: Send + 'static {
    /// Handle an `L` frame body.
    fn process_login(&mut self, ops: &mut ServerOps<'_, S, E>, body: &[u8]);

    /// Handle a `U` frame body.
    fn process_unsequenced(&mut self, ops: &mut ServerOps<'_, S, E>, body: &[u8]);
}

/// Processes inbound sequenced application messages.
pub trait ClientHandler: Send + 'static {
    /// Invoked after the session has persisted `body` via `store_input` and
    /// advanced its sequence counter.
    fn process_sequenced(&mut self, body: &Bytes);
}
