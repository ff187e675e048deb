//! soupbin client binary: connects, logs in, then reads commands from
//! stdin until `quit` or `logout`.
//!
//! # Commands
//!
//! - `q` / `quit` — exit without logging out
//! - `lo` / `logout` — send a logout frame and exit once it is flushed
//! - `debug <text>` — send a debug-text frame with `<text>` verbatim
//! - `date` — ask the server for the current time via an unsequenced frame
//! - anything else is logged and ignored

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use soupbin_client::LoggingClientHandler;
use soupbin_core::session::ClientSession;
use soupbin_core::system_env::SystemEnv;
use soupbin_storage::RedbStorage;

/// soupbin protocol client
#[derive(Parser, Debug)]
#[command(name = "soupbin-client")]
#[command(about = "soupbin session protocol client")]
#[command(version)]
struct Args {
    /// Server address to connect to.
    #[arg(short, long, default_value = "127.0.0.1:25000")]
    server: String,

    /// Username to log in with.
    #[arg(short, long, default_value = "user1")]
    username: String,

    /// Password to log in with.
    #[arg(short, long, default_value = "password1")]
    password: String,

    /// Session name to request.
    #[arg(long, default_value = "session1")]
    session_name: String,

    /// Path to the client's durable input-log database.
    #[arg(long, default_value = "./soupbin-client-data.redb")]
    storage_path: std::path::PathBuf,

    /// Log level (trace, debug, info, warn, error), overridden by `RUST_LOG`.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let storage = RedbStorage::open(&args.storage_path)?;

    let (session, handle) = ClientSession::connect(
        &args.server,
        &args.username,
        &args.password,
        &args.session_name,
        storage,
        SystemEnv::new(),
        LoggingClientHandler,
    )
    .await?;

    let session_task = tokio::spawn(session.run());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "q" | "quit" => break,
            "lo" | "logout" => {
                handle.send_logout();
                break;
            },
            other if other.starts_with("debug ") => {
                handle.send_debug(other["debug ".len()..].as_bytes().to_vec());
            },
            "date" => handle.send_unsequenced(b"date".to_vec()),
            other => tracing::info!(command = %other, "unknown command"),
        }
    }

    let _ = session_task.await;
    Ok(())
}
