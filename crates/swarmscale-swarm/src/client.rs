//! Docker Engine API client.

use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full};
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use swarmscale_core::{
    ConfigError, ConfigResult, Orchestrator, OrchestratorConfig, OrchestratorError,
    OrchestratorResult, ServiceHandle,
};

/// Where the Docker daemon listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `host:port`
    Tcp(String),
    Unix(PathBuf),
}

impl Endpoint {
    /// Parse `unix:///path`, `tcp://host:port` or a bare `host:port`.
    pub fn parse(s: &str) -> ConfigResult<Self> {
        let s = s.trim();
        let endpoint = if let Some(path) = s.strip_prefix("unix://") {
            Endpoint::Unix(PathBuf::from(path))
        } else if let Some(addr) = s.strip_prefix("tcp://") {
            Endpoint::Tcp(addr.trim_end_matches('/').to_string())
        } else if s.contains("://") {
            return Err(ConfigError::Invalid(format!(
                "unsupported orchestrator endpoint scheme: {s}"
            )));
        } else {
            Endpoint::Tcp(s.to_string())
        };

        match &endpoint {
            Endpoint::Unix(path) if path.as_os_str().is_empty() => Err(ConfigError::Invalid(
                "orchestrator endpoint has an empty socket path".to_string(),
            )),
            Endpoint::Tcp(addr) if !addr.contains(':') => Err(ConfigError::Invalid(format!(
                "orchestrator endpoint must be host:port, got {addr}"
            ))),
            _ => Ok(endpoint),
        }
    }

    fn host_header(&self) -> &str {
        match self {
            Endpoint::Tcp(addr) => addr,
            Endpoint::Unix(_) => "docker",
        }
    }
}

/// An orchestrator backed by a Docker Swarm manager.
#[derive(Debug, Clone)]
pub struct DockerSwarm {
    endpoint: Endpoint,
    timeout: Duration,
}

#[derive(Deserialize)]
struct ServiceSummary {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Spec")]
    spec: SpecName,
}

#[derive(Deserialize)]
struct SpecName {
    #[serde(rename = "Name")]
    name: String,
}

#[derive(Deserialize)]
struct ServiceInspect {
    #[serde(rename = "Version")]
    version: ObjectVersion,
    /// Kept opaque so an update round-trips fields we don't model.
    #[serde(rename = "Spec")]
    spec: Value,
}

#[derive(Deserialize)]
struct ObjectVersion {
    #[serde(rename = "Index")]
    index: u64,
}

#[derive(Deserialize)]
struct DockerMessage {
    message: String,
}

#[derive(Deserialize)]
struct UpdateResponse {
    #[serde(rename = "Warnings", default)]
    warnings: Option<Vec<String>>,
}

impl DockerSwarm {
    pub fn new(endpoint: Endpoint, timeout: Duration) -> Self {
        Self { endpoint, timeout }
    }

    pub fn from_config(config: &OrchestratorConfig) -> ConfigResult<Self> {
        Ok(Self::new(Endpoint::parse(&config.endpoint)?, config.timeout()))
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn inspect(&self, service: &ServiceHandle) -> OrchestratorResult<ServiceInspect> {
        let path = format!("/services/{}", service.id);
        let body = self.call(Method::GET, &path, None, &service.name).await?;
        decode(&body)
    }

    /// Issue a request and map non-2xx statuses onto [`OrchestratorError`].
    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        subject: &str,
    ) -> OrchestratorResult<Bytes> {
        let (status, bytes) = self.request(method.clone(), path, body).await?;
        if status.is_success() {
            return Ok(bytes);
        }

        let message = serde_json::from_slice::<DockerMessage>(&bytes)
            .map(|m| m.message)
            .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).trim().to_string());
        debug!(%method, %path, %status, %message, "docker API error");

        Err(match status {
            StatusCode::NOT_FOUND => OrchestratorError::NotFound(subject.to_string()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                OrchestratorError::PermissionDenied(message)
            }
            s if s.is_server_error() => OrchestratorError::Unavailable(message),
            s => OrchestratorError::Api {
                status: s.as_u16(),
                message,
            },
        })
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> OrchestratorResult<(StatusCode, Bytes)> {
        let host = self.endpoint.host_header().to_string();
        let req = http::Request::builder()
            .method(method.clone())
            .uri(path)
            .header("host", host)
            .header("user-agent", "swarmscale/0.1")
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from(body.unwrap_or_default())))
            .map_err(|e| OrchestratorError::Unavailable(format!("invalid request {path}: {e}")))?;

        let exchange = async move {
            match &self.endpoint {
                Endpoint::Tcp(addr) => {
                    let stream = tokio::net::TcpStream::connect(addr.as_str())
                        .await
                        .map_err(|e| unavailable(&self.endpoint, e))?;
                    send(stream, req).await
                }
                Endpoint::Unix(socket) => {
                    let stream = tokio::net::UnixStream::connect(socket)
                        .await
                        .map_err(|e| unavailable(&self.endpoint, e))?;
                    send(stream, req).await
                }
            }
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(OrchestratorError::Unavailable(format!(
                "{method} {path} timed out after {:?}",
                self.timeout
            ))),
        }
    }
}

impl Orchestrator for DockerSwarm {
    async fn find_service(&self, name: &str) -> OrchestratorResult<ServiceHandle> {
        let filters = serde_json::json!({ "name": [name] }).to_string();
        let encoded: String = url::form_urlencoded::byte_serialize(filters.as_bytes()).collect();
        let path = format!("/services?filters={encoded}");

        let body = self.call(Method::GET, &path, None, name).await?;
        let services: Vec<ServiceSummary> = decode(&body)?;

        // The name filter also matches prefixes.
        services
            .into_iter()
            .find(|s| s.spec.name == name)
            .map(|s| ServiceHandle {
                id: s.id,
                name: s.spec.name,
            })
            .ok_or_else(|| OrchestratorError::NotFound(name.to_string()))
    }

    async fn replica_count(&self, service: &ServiceHandle) -> OrchestratorResult<u32> {
        let inspect = self.inspect(service).await?;
        replicas_of(&inspect.spec, &service.name)
    }

    async fn set_replica_count(
        &self,
        service: &ServiceHandle,
        replicas: u32,
    ) -> OrchestratorResult<()> {
        let ServiceInspect { version, mut spec } = self.inspect(service).await?;

        let replicated = spec
            .pointer_mut("/Mode/Replicated")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| not_replicated(&service.name))?;
        replicated.insert("Replicas".to_string(), Value::from(replicas));

        let body = serde_json::to_vec(&spec)
            .map_err(|e| OrchestratorError::Decode(format!("encode service spec: {e}")))?;
        let path = format!("/services/{}/update?version={}", service.id, version.index);
        let response = self
            .call(Method::POST, &path, Some(body), &service.name)
            .await?;

        if let Ok(UpdateResponse {
            warnings: Some(warnings),
        }) = serde_json::from_slice::<UpdateResponse>(&response)
        {
            for warning in warnings {
                warn!(service = %service.name, %warning, "docker service update warning");
            }
        }

        debug!(service = %service.name, replicas, version = version.index, "service update accepted");
        Ok(())
    }
}

/// Run one HTTP/1 exchange over an established stream.
async fn send<S>(
    stream: S,
    req: http::Request<Full<Bytes>>,
) -> OrchestratorResult<(StatusCode, Bytes)>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let io = hyper_util::rt::TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake::<_, Full<Bytes>>(io)
        .await
        .map_err(|e| OrchestratorError::Unavailable(format!("handshake failed: {e}")))?;

    // Drive the connection in the background.
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!(error = %e, "docker connection closed with error");
        }
    });

    let resp = sender
        .send_request(req)
        .await
        .map_err(|e| OrchestratorError::Unavailable(format!("request failed: {e}")))?;
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .map_err(|e| OrchestratorError::Unavailable(format!("reading response failed: {e}")))?
        .to_bytes();
    Ok((status, body))
}

fn replicas_of(spec: &Value, name: &str) -> OrchestratorResult<u32> {
    let replicated = spec
        .pointer("/Mode/Replicated")
        .and_then(Value::as_object)
        .ok_or_else(|| not_replicated(name))?;

    // Docker omits the field for the default of one replica.
    match replicated.get("Replicas") {
        None | Some(Value::Null) => Ok(1),
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| OrchestratorError::Decode(format!("invalid replica count {v}"))),
    }
}

fn decode<T: serde::de::DeserializeOwned>(body: &[u8]) -> OrchestratorResult<T> {
    serde_json::from_slice(body).map_err(|e| OrchestratorError::Decode(e.to_string()))
}

fn not_replicated(name: &str) -> OrchestratorError {
    OrchestratorError::Unsupported(format!("service {name} is not in replicated mode"))
}

fn unavailable(endpoint: &Endpoint, err: std::io::Error) -> OrchestratorError {
    OrchestratorError::Unavailable(format!("connect to {endpoint:?}: {err}"))
}
