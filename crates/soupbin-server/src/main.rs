//! soupbin server binary.
//!
//! # Usage
//!
//! ```bash
//! soupbin-server --bind 0.0.0.0:25000 --storage-dir ./data
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use soupbin_core::system_env::SystemEnv;
use soupbin_server::InMemoryAuthenticator;
use soupbin_storage::RedbStorage;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// soupbin protocol server
#[derive(Parser, Debug)]
#[command(name = "soupbin-server")]
#[command(about = "soupbin session protocol server")]
#[command(version)]
struct Args {
    /// Address to bind to.
    #[arg(short, long, default_value = "0.0.0.0:25000")]
    bind: String,

    /// Directory holding the durable session log database.
    #[arg(long, default_value = "./soupbin-data")]
    storage_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error), overridden by `RUST_LOG`.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    std::fs::create_dir_all(&args.storage_dir)?;
    let db_path = args.storage_dir.join("soupbin.redb");
    let storage = RedbStorage::open(&db_path)?;

    let authenticator = Arc::new(InMemoryAuthenticator::with_default_test_user());

    tracing::info!(bind = %args.bind, storage = %db_path.display(), "soupbin-server starting");

    soupbin_server::serve(&args.bind, storage, SystemEnv::new(), authenticator).await?;

    Ok(())
}
