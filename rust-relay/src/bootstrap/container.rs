//! Container index discovery through the Docker Engine API.
//!
//! Replicas started by `docker compose --scale` are named
//! `<project>_<service>_<n>`. The `n` picks which provisioned routing key
//! this replica uses, so each replica gets its own rate-limit budget.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;

/// Subset of `GET /containers/{id}/json` the relay reads.
#[derive(Debug, Deserialize)]
pub struct ContainerInfo {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Config")]
    pub config: ContainerConfig,
}

#[derive(Debug, Deserialize)]
pub struct ContainerConfig {
    #[serde(rename = "Hostname")]
    pub hostname: String,
}

/// Reasons the Docker lookup can fail. All of them fall back to index 1.
#[derive(Debug, Error)]
pub enum DockerError {
    #[error("docker socket I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed docker API response")]
    MalformedResponse,

    #[error("docker API returned HTTP {0}")]
    Status(u16),

    #[error("unexpected container JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("container name {0:?} has no replica index")]
    UnrecognizedName(String),

    #[error("docker lookup is only supported on unix")]
    Unsupported,
}

/// Resolve this replica's 1-based routing key index.
///
/// An explicit `CONTAINER_INDEX` wins; otherwise the Docker API is asked.
/// Any lookup failure falls back to the first key.
pub async fn container_index(config: &Config) -> usize {
    if let Some(index) = config.container_index {
        info!(container_index = index, "container_index_configured");
        return index;
    }

    let Some(hostname) = config.hostname.as_deref() else {
        warn!("Unable to determine container name - defaulting to first routing key available");
        return 1;
    };

    let lookup = async {
        let info = inspect_container(&config.docker_socket, hostname).await?;
        let index = parse_replica_index(&info.name, &config.container_name_prefix)
            .ok_or_else(|| DockerError::UnrecognizedName(info.name.clone()))?;
        Ok::<_, DockerError>((index, info))
    };

    match lookup.await {
        Ok((index, info)) => {
            info!(
                container_name = %info.name,
                container_id = %info.config.hostname,
                container_index = index,
                "container_identified"
            );
            index
        }
        Err(e) => {
            warn!(
                hostname = %hostname,
                error = %e,
                "Unable to determine container name - defaulting to first routing key available"
            );
            1
        }
    }
}

/// Extract the replica number following `prefix` in a container name.
pub fn parse_replica_index(name: &str, prefix: &str) -> Option<usize> {
    let (_, suffix) = name.split_once(prefix)?;
    suffix.trim().parse().ok().filter(|idx| *idx > 0)
}

/// Inspect a container over the Docker unix socket.
#[cfg(unix)]
pub async fn inspect_container(socket: &Path, id: &str) -> Result<ContainerInfo, DockerError> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::UnixStream;

    let mut stream = UnixStream::connect(socket).await?;

    // HTTP/1.0 keeps the response unchunked and closes the connection after it.
    let request = format!("GET /containers/{id}/json HTTP/1.0\r\nHost: docker\r\n\r\n");
    stream.write_all(request.as_bytes()).await?;

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await?;

    let body = split_http_response(&raw)?;
    Ok(serde_json::from_slice(body)?)
}

#[cfg(not(unix))]
pub async fn inspect_container(_socket: &Path, _id: &str) -> Result<ContainerInfo, DockerError> {
    Err(DockerError::Unsupported)
}

/// Check the status line and return the body of a raw HTTP response.
fn split_http_response(raw: &[u8]) -> Result<&[u8], DockerError> {
    let header_end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or(DockerError::MalformedResponse)?;

    let head = std::str::from_utf8(&raw[..header_end]).map_err(|_| DockerError::MalformedResponse)?;
    let status: u16 = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .ok_or(DockerError::MalformedResponse)?;

    if !(200..300).contains(&status) {
        return Err(DockerError::Status(status));
    }

    Ok(&raw[header_end + 4..])
}
