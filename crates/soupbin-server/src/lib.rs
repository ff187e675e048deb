//! soupbin protocol server library: the application handler, the seed
//! authenticator, and the accept loop that binds them to the session core.

mod authenticator;
mod handler;

pub use authenticator::InMemoryAuthenticator;
pub use handler::SoupbinServerHandler;

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use soupbin_core::env::Environment;
use soupbin_core::session::ServerSession;
use soupbin_core::storage::Storage;
use soupbin_core::Authenticator;

/// Bind `addr` and accept connections forever, spawning one [`ServerSession`]
/// per peer. Each session gets its own `SoupbinServerHandler` instance
/// sharing the same authenticator and storage handle.
///
/// # Errors
///
/// Returns an error if `addr` cannot be bound.
pub async fn serve<S, E, A>(addr: &str, storage: S, env: E, authenticator: Arc<A>) -> std::io::Result<()>
where
    S: Storage,
    E: Environment,
    A: Authenticator,
{
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(error) => {
                warn!(%error, "accept failed");
                continue;
            },
        };

        let handler = SoupbinServerHandler::new(Arc::clone(&authenticator));
        let session = ServerSession::new(stream, peer_addr, storage.clone(), env.clone(), handler);
        tokio::spawn(session.run());
    }
}
