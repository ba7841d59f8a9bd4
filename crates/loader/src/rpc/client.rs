//! The package-server RPC loader.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use jadep_core::{Error, Package, Result};

use super::wire::{deserialize_packages, LoadRequest, LoadResponse, Reply, Request};
use crate::Loader;

/// A bidirectional byte stream to the package server (Unix or TCP).
pub(crate) trait ServerStream: AsyncRead + AsyncWrite + Send + Unpin {}
impl<T: AsyncRead + AsyncWrite + Send + Unpin> ServerStream for T {}

pub(crate) type Conn = BufStream<Box<dyn ServerStream>>;

/// Sends one request frame and reads one reply frame.
pub(crate) async fn call<T: DeserializeOwned>(conn: &mut Conn, request: &Request) -> Result<T> {
    write_frame(conn, request).await?;
    let mut line = String::new();
    let n = conn.read_line(&mut line).await?;
    if n == 0 {
        return Err(Error::rpc("connection closed by package server"));
    }
    let reply: Reply<T> = serde_json::from_str(&line)
        .map_err(|e| Error::rpc(format!("malformed reply from package server: {e}")))?;
    if let Some(error) = reply.error {
        return Err(Error::rpc(error));
    }
    reply
        .ok
        .ok_or_else(|| Error::rpc("reply carries neither ok nor error"))
}

/// Sends one request frame without waiting for a reply.
pub(crate) async fn write_frame(conn: &mut Conn, request: &impl Serialize) -> Result<()> {
    let mut line = serde_json::to_string(request)
        .map_err(|e| Error::rpc(format!("cannot serialize request: {e}")))?;
    line.push('\n');
    conn.write_all(line.as_bytes()).await?;
    conn.flush().await?;
    Ok(())
}

/// A [`Loader`] that asks a package-server over RPC to interpret BUILD
/// files.
pub struct RpcLoader {
    conn: Mutex<Conn>,
    timeout: Duration,
    workspace_root: String,
    install_base: String,
    output_base: String,
    rule_kinds_to_serialize: Vec<String>,
    cancel: CancellationToken,
}

impl RpcLoader {
    /// Creates a new loader over an established connection.
    ///
    /// `workspace_root` is the root Bazel directory (contains a WORKSPACE
    /// file). `install_base` and `output_base` are Bazel's current bases,
    /// as printed by `bazel info`. `rule_kinds_to_serialize` limits what
    /// the server sends back; empty means everything.
    pub(crate) fn new(
        conn: Conn,
        timeout: Duration,
        workspace_root: String,
        install_base: String,
        output_base: String,
        rule_kinds_to_serialize: Vec<String>,
        cancel: CancellationToken,
    ) -> RpcLoader {
        RpcLoader {
            conn: Mutex::new(conn),
            timeout,
            workspace_root,
            install_base,
            output_base,
            rule_kinds_to_serialize,
            cancel,
        }
    }
}

#[async_trait]
impl Loader for RpcLoader {
    async fn load(&self, packages: &[String]) -> Result<HashMap<String, Arc<Package>>> {
        let request = Request::Load(LoadRequest {
            workspace_dir: self.workspace_root.clone(),
            install_base: self.install_base.clone(),
            output_base: self.output_base.clone(),
            packages: packages.to_vec(),
            rule_kinds_to_serialize: self.rule_kinds_to_serialize.clone(),
        });

        let stopwatch = Instant::now();
        let mut conn = self.conn.lock().await;
        let response: LoadResponse = tokio::select! {
            _ = self.cancel.cancelled() => return Err(Error::Cancelled),
            response = tokio::time::timeout(self.timeout, call(&mut conn, &request)) => {
                response.map_err(|_| {
                    Error::rpc(format!("load deadline ({:?}) exceeded", self.timeout))
                })??
            }
        };
        drop(conn);
        debug!(
            "Loading {} package(s) took {}ms",
            packages.len(),
            stopwatch.elapsed().as_millis()
        );

        Ok(deserialize_packages(response))
    }
}
