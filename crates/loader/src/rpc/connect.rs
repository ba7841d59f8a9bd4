//! Dial-or-start lifecycle for the package server.
//!
//! A local server (Unix socket or localhost TCP) is started on demand and
//! restarted when its version no longer matches the executable on disk.
//! The version of a running server is the mtime of the executable it was
//! started from, so an upgraded binary forces a restart.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, SystemTime};
use tokio::io::{AsyncBufReadExt, BufStream};
use tokio::net::{TcpStream, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use jadep_core::{Error, PkgLoaderConfig, Result};

use super::client::{call, write_frame, Conn, RpcLoader, ServerStream};
use super::wire::{Request, VersionResponse};

const DIAL_TIMEOUT: Duration = Duration::from_secs(1);
const REDIAL_INTERVAL: Duration = Duration::from_millis(100);

/// Where to reach the package server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindLocation {
    /// `unix://<path>`: a Unix-domain socket; a server may be started.
    Unix(PathBuf),
    /// `localhost:<port>`: local TCP; a server may be started.
    Localhost(u16),
    /// Anything else: a remote endpoint, never started by us.
    Remote(String),
}

impl BindLocation {
    pub fn parse(s: &str) -> BindLocation {
        if let Some(path) = s.strip_prefix("unix://") {
            return BindLocation::Unix(PathBuf::from(path));
        }
        if let Some(port) = s.strip_prefix("localhost:") {
            if let Ok(port) = port.parse::<u16>() {
                return BindLocation::Localhost(port);
            }
        }
        BindLocation::Remote(s.to_string())
    }

    /// Whether we are allowed to start a server for this location.
    fn is_local(&self) -> bool {
        !matches!(self, BindLocation::Remote(_))
    }

    /// The `--bind` parameter a started server expects.
    fn bind_param(&self) -> String {
        match self {
            BindLocation::Unix(path) => format!("unix://{}", path.display()),
            BindLocation::Localhost(port) => port.to_string(),
            BindLocation::Remote(addr) => addr.clone(),
        }
    }
}

/// Connects to a package server at `config.bind_location`, starting one if
/// there isn't one, and restarting an existing local one if it's stale.
pub async fn connect(
    config: &PkgLoaderConfig,
    workspace_root: String,
    rule_kinds_to_serialize: Vec<String>,
    cancel: CancellationToken,
) -> Result<RpcLoader> {
    let location = BindLocation::parse(&config.bind_location);
    let conn = dial_and_start(config, &location, &cancel).await?;
    Ok(RpcLoader::new(
        conn,
        Duration::from_secs(config.rpc_deadline_secs),
        workspace_root,
        config.install_base.clone(),
        config.output_base.clone(),
        rule_kinds_to_serialize,
        cancel,
    ))
}

async fn dial_and_start(
    config: &PkgLoaderConfig,
    location: &BindLocation,
    cancel: &CancellationToken,
) -> Result<Conn> {
    info!("Connecting to package server at {:?}", location);
    let connect_timeout = Duration::from_secs(config.connect_timeout_secs);

    match dial(location).await {
        Err(_) if location.is_local() => {
            // No server answered; start one and keep dialing.
            start_server(&config.executable, location)?;
            attempt_dial(location, connect_timeout, cancel).await
        }
        Err(e) => Err(e),
        Ok(conn) if !location.is_local() => Ok(conn),
        Ok(mut conn) => {
            // A local server answered; restart it if it's stale.
            if kill_server_if_old(&config.executable, &mut conn).await? {
                start_server(&config.executable, location)?;
                attempt_dial(location, connect_timeout, cancel).await
            } else {
                Ok(conn)
            }
        }
    }
}

async fn dial(location: &BindLocation) -> Result<Conn> {
    let stream: Box<dyn ServerStream> = match location {
        BindLocation::Unix(path) => {
            let stream = tokio::time::timeout(DIAL_TIMEOUT, UnixStream::connect(path))
                .await
                .map_err(|_| Error::rpc(format!("timed out dialing {}", path.display())))??;
            Box::new(stream)
        }
        BindLocation::Localhost(port) => {
            let stream =
                tokio::time::timeout(DIAL_TIMEOUT, TcpStream::connect(("127.0.0.1", *port)))
                    .await
                    .map_err(|_| Error::rpc(format!("timed out dialing localhost:{port}")))??;
            Box::new(stream)
        }
        BindLocation::Remote(addr) => {
            let stream = tokio::time::timeout(DIAL_TIMEOUT, TcpStream::connect(addr))
                .await
                .map_err(|_| Error::rpc(format!("timed out dialing {addr}")))??;
            Box::new(stream)
        }
    };
    Ok(BufStream::new(stream))
}

/// Keeps dialing until `connect_timeout` elapses.
async fn attempt_dial(
    location: &BindLocation,
    connect_timeout: Duration,
    cancel: &CancellationToken,
) -> Result<Conn> {
    let stopwatch = std::time::Instant::now();
    while stopwatch.elapsed() < connect_timeout {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if let Ok(conn) = dial(location).await {
            return Ok(conn);
        }
        tokio::time::sleep(REDIAL_INTERVAL).await;
    }
    Err(Error::rpc(format!(
        "timeout ({connect_timeout:?}) while connecting to {location:?}"
    )))
}

/// Spawns the server executable. The child is detached; it outlives us.
fn start_server(executable: &Path, location: &BindLocation) -> Result<()> {
    info!("No package server found, starting one.");
    let mtime = mod_time(executable)?;
    let child = tokio::process::Command::new(executable)
        .arg(format!("--bind={}", location.bind_param()))
        .arg(format!("--version={mtime}"))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(false)
        .spawn()
        .map_err(|e| {
            Error::rpc(format!(
                "error starting package server {}: {e}",
                executable.display()
            ))
        })?;
    debug!(
        "Started package server: {} --bind={} --version={mtime} (pid {:?})",
        executable.display(),
        location.bind_param(),
        child.id()
    );
    drop(child);
    Ok(())
}

/// Shuts the server down (through the version-management service) if its
/// version differs from the executable's mtime. Returns true if it did.
async fn kill_server_if_old(executable: &Path, conn: &mut Conn) -> Result<bool> {
    let mtime = mod_time(executable)?;
    let version: VersionResponse = call(conn, &Request::Version).await?;
    if version.version == mtime.to_string() {
        return Ok(false);
    }
    info!("Currently running package server is stale, restarting it");

    // The server forcibly terminates before answering, so a broken
    // connection is the expected outcome. A clean reply means it ignored us.
    if write_frame(conn, &Request::Shutdown).await.is_err() {
        return Ok(true);
    }
    let mut line = String::new();
    match conn.read_line(&mut line).await {
        Ok(n) if n > 0 => Err(Error::rpc(
            "package server replied to shutdown instead of terminating",
        )),
        _ => Ok(true),
    }
}

/// The modification time of `file_name`, in seconds since the Unix epoch.
fn mod_time(file_name: &Path) -> Result<u64> {
    let metadata = std::fs::metadata(file_name).map_err(|e| {
        Error::rpc(format!(
            "error getting the modification time of {}: {e}",
            file_name.display()
        ))
    })?;
    let mtime = metadata
        .modified()
        .map_err(|e| Error::rpc(format!("mtime unavailable: {e}")))?;
    Ok(mtime
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs())
}
