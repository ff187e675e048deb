//! Application-level server handler: login processing and the single
//! supplemented unsequenced command, `date`.

use std::sync::Arc;

use chrono::DateTime;
use tracing::info;

use soupbin_core::env::Environment;
use soupbin_core::handler::{ServerHandler, ServerOps};
use soupbin_core::session::server::reject_on_error;
use soupbin_core::storage::Storage;
use soupbin_core::Authenticator;
use soupbin_proto::{packet_type, LoginRequest};

/// Authenticates logins against an injected [`Authenticator`] and answers
/// the `date` unsequenced command.
pub struct SoupbinServerHandler<A: Authenticator> {
    authenticator: Arc<A>,
}

impl<A: Authenticator> SoupbinServerHandler<A> {
    /// Build a handler backed by `authenticator`.
    pub fn new(authenticator: Arc<A>) -> Self {
        Self { authenticator }
    }
}

impl<A: Authenticator, S: Storage, E: Environment> ServerHandler<S, E> for SoupbinServerHandler<A> {
    fn process_login(&mut self, ops: &mut ServerOps<'_, S, E>, body: &[u8]) {
        let login = match LoginRequest::decode(body) {
            Ok(login) => login,
            Err(error) => {
                info!(%error, "rejecting login: malformed body");
                let _ = ops.reject_login(packet_type::REJECT_NOT_AUTHORIZED);
                return;
            },
        };

        if !self.authenticator.authenticate(&login.username, &login.password, &login.session_name) {
            info!(username = %login.username, session_name = %login.session_name, "rejecting login: not authorized");
            let _ = ops.reject_login(packet_type::REJECT_NOT_AUTHORIZED);
            return;
        }

        info!(
            username = %login.username,
            session_name = %login.session_name,
            sequence = login.sequence,
            "accepting login"
        );

        let result = ops.open_session(&login.session_name).and_then(|()| {
            let next_sequence = ops.next_output_sequence()?;
            let accept = soupbin_proto::LoginAccept { session_name: login.session_name.clone(), sequence: next_sequence };
            ops.send_login_accept(&accept.encode())?;
            ops.replay_sequenced(login.sequence)
        });
        reject_on_error(ops, result);
    }

    fn process_unsequenced(&mut self, ops: &mut ServerOps<'_, S, E>, body: &[u8]) {
        if body == b"date" {
            let secs = ops.wall_clock_secs();
            let formatted = DateTime::from_timestamp(secs.try_into().unwrap_or(i64::MAX), 0)
                .map_or_else(|| secs.to_string(), |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string());
            let _ = ops.send_sequenced(formatted.as_bytes());
        }
    }
}
