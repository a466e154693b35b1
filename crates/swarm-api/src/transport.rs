//! Raw request/response exchange with the engine.
//!
//! TCP endpoints go through a pooled reqwest client. A `unix://` endpoint
//! opens one HTTP/1 connection per request on the socket.

use crate::error::SwarmApiError;
use enforcer_core::RegistryError;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use std::path::PathBuf;
use std::time::Duration;

/// Status and body of one engine response.
#[derive(Debug)]
pub(crate) struct EngineResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Endpoint {
    Http(String),
    Unix(PathBuf),
}

impl Endpoint {
    /// Accepts `unix://`, `tcp://`, `http://` and `https://` hosts.
    pub fn parse(host: &str) -> Result<Self, SwarmApiError> {
        let host = host.trim();
        if let Some(path) = host.strip_prefix("unix://") {
            if path.is_empty() || !cfg!(unix) {
                return Err(SwarmApiError::UnsupportedHost(host.to_string()));
            }
            return Ok(Endpoint::Unix(PathBuf::from(path)));
        }

        let host = host.trim_end_matches('/');
        let url = if let Some(rest) = host.strip_prefix("tcp://") {
            format!("http://{rest}")
        } else if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            return Err(SwarmApiError::UnsupportedHost(host.to_string()));
        };
        if url.ends_with("://") {
            return Err(SwarmApiError::UnsupportedHost(host.to_string()));
        }
        Ok(Endpoint::Http(url))
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Transport {
    Http { client: Client, base_url: String },
    Unix { socket: PathBuf },
}

impl Transport {
    pub fn new(endpoint: Endpoint, timeout: Duration) -> Result<Self, SwarmApiError> {
        match endpoint {
            Endpoint::Http(base_url) => {
                let client = Client::builder()
                    .timeout(timeout)
                    .connect_timeout(timeout.min(Duration::from_secs(10)))
                    .pool_idle_timeout(Duration::from_secs(90))
                    .build()?;
                Ok(Transport::Http { client, base_url })
            }
            Endpoint::Unix(socket) => Ok(Transport::Unix { socket }),
        }
    }

    /// Human-readable location of the engine, e.g. `unix:///var/run/docker.sock`.
    pub fn describe(&self) -> String {
        match self {
            Transport::Http { base_url, .. } => base_url.clone(),
            Transport::Unix { socket } => format!("unix://{}", socket.display()),
        }
    }

    /// Send one request. `path` includes the API version prefix and query.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        json_body: Option<Vec<u8>>,
        timeout: Duration,
    ) -> Result<EngineResponse, RegistryError> {
        match self {
            Transport::Http { client, base_url } => {
                let mut request = client.request(method, format!("{base_url}{path}"));
                if let Some(body) = json_body {
                    request = request.header(CONTENT_TYPE, "application/json").body(body);
                }
                let response = request
                    .send()
                    .await
                    .map_err(|e| reqwest_error(e, timeout))?;
                let status = response.status().as_u16();
                let body = response
                    .text()
                    .await
                    .map_err(|e| reqwest_error(e, timeout))?;
                Ok(EngineResponse { status, body })
            }
            Transport::Unix { socket } => {
                tokio::time::timeout(timeout, unix::send(socket, method, path, json_body))
                    .await
                    .map_err(|_| RegistryError::Timeout(timeout))?
            }
        }
    }
}

fn reqwest_error(e: reqwest::Error, timeout: Duration) -> RegistryError {
    if e.is_timeout() {
        RegistryError::Timeout(timeout)
    } else if e.is_decode() {
        RegistryError::Decode(e.to_string())
    } else {
        RegistryError::Unreachable(e.to_string())
    }
}

#[cfg(unix)]
mod unix {
    use super::EngineResponse;
    use enforcer_core::RegistryError;
    use http_body_util::{BodyExt, Full};
    use hyper::body::Bytes;
    use hyper::header::{CONTENT_TYPE, HOST};
    use hyper_util::rt::TokioIo;
    use reqwest::Method;
    use std::path::Path;
    use tokio::net::UnixStream;

    pub(super) async fn send(
        socket: &Path,
        method: Method,
        path: &str,
        json_body: Option<Vec<u8>>,
    ) -> Result<EngineResponse, RegistryError> {
        let stream = UnixStream::connect(socket)
            .await
            .map_err(|e| unreachable(socket, e))?;
        let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .map_err(|e| unreachable(socket, e))?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::debug!(error = %e, "engine socket connection closed");
            }
        });

        let mut builder = hyper::Request::builder()
            .method(method.as_str())
            .uri(path)
            .header(HOST, "docker");
        let body = match json_body {
            Some(bytes) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Full::new(Bytes::from(bytes))
            }
            None => Full::new(Bytes::new()),
        };
        let request = builder
            .body(body)
            .map_err(|e| RegistryError::Decode(e.to_string()))?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|e| unreachable(socket, e))?;
        let status = response.status().as_u16();
        let bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| unreachable(socket, e))?
            .to_bytes();
        let body = String::from_utf8(bytes.to_vec())
            .map_err(|e| RegistryError::Decode(e.to_string()))?;
        Ok(EngineResponse { status, body })
    }

    fn unreachable(socket: &Path, e: impl std::fmt::Display) -> RegistryError {
        RegistryError::Unreachable(format!("{}: {e}", socket.display()))
    }
}

#[cfg(not(unix))]
mod unix {
    use super::EngineResponse;
    use enforcer_core::RegistryError;
    use reqwest::Method;
    use std::path::Path;

    pub(super) async fn send(
        socket: &Path,
        _: Method,
        _: &str,
        _: Option<Vec<u8>>,
    ) -> Result<EngineResponse, RegistryError> {
        Err(RegistryError::Unreachable(format!(
            "{}: local sockets are not supported on this platform",
            socket.display()
        )))
    }
}
