//! soupbin protocol client library: the logging handler used by the binary.

mod handler;

pub use handler::LoggingClientHandler;
