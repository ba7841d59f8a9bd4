//! Package-server client settings.
//!
//! Everything else jadep needs for an invocation arrives through CLI
//! flags and is wired straight into the engine; only the server client
//! has enough knobs to warrant a named struct that travels through the
//! connect path.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_rpc_deadline_secs() -> u64 {
    10
}

fn default_connect_timeout_secs() -> u64 {
    30
}

/// How to reach (and if needed, start) the package server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PkgLoaderConfig {
    /// Path to the package-server executable, spawned on demand for local
    /// bind locations.
    pub executable: PathBuf,

    /// Where to reach the server: `unix://<path>`, `localhost:<port>`, or a
    /// remote address.
    pub bind_location: String,

    /// Deadline for a single load RPC, in seconds.
    #[serde(default = "default_rpc_deadline_secs")]
    pub rpc_deadline_secs: u64,

    /// How long to keep dialing a freshly started server, in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Bazel's install base, as reported by `bazel info`.
    #[serde(default)]
    pub install_base: String,

    /// Bazel's output base, as reported by `bazel info`.
    #[serde(default)]
    pub output_base: String,
}

impl Default for PkgLoaderConfig {
    fn default() -> PkgLoaderConfig {
        PkgLoaderConfig {
            executable: PathBuf::new(),
            bind_location: String::new(),
            rpc_deadline_secs: default_rpc_deadline_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            install_base: String::new(),
            output_base: String::new(),
        }
    }
}
