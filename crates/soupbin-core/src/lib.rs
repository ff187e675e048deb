//! Session core: the durable log contract, the environment abstraction, and
//! the server/client role state machines built on top of the wire codec in
//! `soupbin-proto`.

pub mod authenticator;
pub mod env;
pub mod error;
pub mod handler;
pub mod session;
pub mod storage;
pub mod system_env;

pub use authenticator::Authenticator;
pub use env::Environment;
pub use error::SessionError;
pub use handler::{ClientHandler, ServerHandler, ServerOps};
pub use session::{ClientCommand, ClientHandle, ClientSession, ServerSession};
pub use storage::{LogEntry, SessionLog, Storage, StorageError};
pub use system_env::SystemEnv;
