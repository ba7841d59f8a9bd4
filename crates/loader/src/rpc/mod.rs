//! RPC client for the package server.
//!
//! The server interprets BUILD files out of process. The protocol is
//! newline-delimited JSON over a Unix-domain or TCP socket: one request
//! object per line, one reply object per line. Two services are exposed:
//! package loading, and version management (used to restart stale local
//! servers).

mod client;
mod connect;
pub mod wire;

pub use client::RpcLoader;
pub use connect::{connect, BindLocation};
