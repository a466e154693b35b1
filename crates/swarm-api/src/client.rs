use crate::error::SwarmApiError;
use crate::transport::{Endpoint, EngineResponse, Transport};
use crate::wire::{self, EngineMessage, ServiceObject, UpdateResponse};
use async_trait::async_trait;
use enforcer_core::{RegistryError, ServiceRegistry, ServiceSnapshot, UpdateIntent};
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;

/// Docker Engine client scoped to swarm services.
#[derive(Debug, Clone)]
pub struct SwarmClient {
    transport: Transport,
    prefix: String,
    timeout: Duration,
}

impl SwarmClient {
    /// `host` accepts `unix://`, `tcp://`, `http://` and `https://` forms;
    /// `api_version` (e.g. `v1.43`) is inserted as a path prefix when given.
    pub fn new(
        host: &str,
        api_version: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, SwarmApiError> {
        let prefix = match api_version.map(str::trim).filter(|v| !v.is_empty()) {
            Some(version) => {
                let version = version.trim_start_matches('/');
                if version.starts_with('v') {
                    format!("/{version}")
                } else {
                    format!("/v{version}")
                }
            }
            None => String::new(),
        };
        let transport = Transport::new(Endpoint::parse(host)?, timeout)?;

        Ok(Self {
            transport,
            prefix,
            timeout,
        })
    }

    /// Where requests go, including any API version prefix.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.transport.describe(), self.prefix)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        json_body: Option<Vec<u8>>,
    ) -> Result<EngineResponse, RegistryError> {
        let path = format!("{}{path}", self.prefix);
        tracing::debug!(endpoint = %self.transport.describe(), %method, %path, "engine request");
        self.transport
            .send(method, &path, json_body, self.timeout)
            .await
    }

    /// `GET /services`
    pub async fn list(&self) -> Result<Vec<ServiceSnapshot>, RegistryError> {
        let response = self.send(Method::GET, "/services", None).await?;
        let body = check_status(response, None)?;
        let objects: Vec<ServiceObject> =
            serde_json::from_str(&body).map_err(|e| RegistryError::Decode(e.to_string()))?;
        Ok(objects.into_iter().map(ServiceSnapshot::from).collect())
    }

    /// `GET /services/{id}`, returning the version index and the raw spec.
    pub async fn inspect_service(&self, id: &str) -> Result<(u64, Value), RegistryError> {
        let response = self
            .send(Method::GET, &format!("/services/{id}"), None)
            .await?;
        let body = check_status(response, Some(id))?;
        let mut object: Value =
            serde_json::from_str(&body).map_err(|e| RegistryError::Decode(e.to_string()))?;

        let version = object
            .pointer("/Version/Index")
            .and_then(Value::as_u64)
            .ok_or_else(|| RegistryError::Decode(format!("service {id} has no Version.Index")))?;
        let spec = object
            .get_mut("Spec")
            .map(Value::take)
            .ok_or_else(|| RegistryError::Decode(format!("service {id} has no Spec")))?;
        Ok((version, spec))
    }

    /// Re-read the service, patch its restart policy and update config, and
    /// submit the whole spec back.
    ///
    /// With `listed_version` set, the update is submitted at that version and
    /// refused with [`RegistryError::Conflict`] when the service has changed
    /// since, so an intent built from a stale listing never lands.
    pub async fn apply(
        &self,
        id: &str,
        listed_version: Option<u64>,
        intent: &UpdateIntent,
    ) -> Result<(), RegistryError> {
        let (current, mut spec) = self.inspect_service(id).await?;
        let version = match listed_version {
            Some(listed) if listed != current => {
                return Err(RegistryError::Conflict {
                    id: id.to_string(),
                    listed,
                    current,
                });
            }
            Some(listed) => listed,
            None => current,
        };
        wire::apply_intent(&mut spec, intent)?;

        let body = serde_json::to_vec(&spec).map_err(|e| RegistryError::Decode(e.to_string()))?;
        let response = self
            .send(
                Method::POST,
                &format!("/services/{id}/update?version={version}"),
                Some(body),
            )
            .await?;
        let body = check_status(response, Some(id))?;

        // Older engines answer with an empty body.
        if !body.trim().is_empty() {
            let parsed: UpdateResponse = serde_json::from_str(&body)
                .map_err(|e| RegistryError::Decode(e.to_string()))?;
            for warning in parsed.warnings.unwrap_or_default() {
                tracing::warn!(service = %id, "engine warning: {warning}");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ServiceRegistry for SwarmClient {
    async fn list_services(&self) -> Result<Vec<ServiceSnapshot>, RegistryError> {
        self.list().await
    }

    async fn update_service(
        &self,
        id: &str,
        version: Option<u64>,
        intent: &UpdateIntent,
    ) -> Result<(), RegistryError> {
        self.apply(id, version, intent).await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The body of a 2xx response, or the engine's complaint as a `RegistryError`.
fn check_status(response: EngineResponse, id: Option<&str>) -> Result<String, RegistryError> {
    let EngineResponse { status, body } = response;
    if (200..300).contains(&status) {
        return Ok(body);
    }
    if status == 404 {
        if let Some(id) = id {
            return Err(RegistryError::NotFound(id.to_string()));
        }
    }

    let message = serde_json::from_str::<EngineMessage>(&body)
        .map(|m| m.message)
        .unwrap_or_else(|_| body.trim().to_string());
    Err(RegistryError::Rejected { status, message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use enforcer_core::types::{
        FailureAction, RestartCondition, RestartPolicy, UpdateConfig, UpdateOrder,
    };
    use mockito::Matcher;
    use serde_json::json;

    const LIST_BODY: &str = r#"[
        {
            "ID": "svc1",
            "Version": { "Index": 11 },
            "Spec": {
                "Name": "web",
                "TaskTemplate": {
                    "ContainerSpec": { "Image": "nginx" },
                    "RestartPolicy": { "Condition": "any", "Delay": 10000000000 }
                },
                "UpdateConfig": { "Delay": 10000000000 }
            }
        },
        {
            "ID": "svc2",
            "Version": { "Index": 4 },
            "Spec": { "Name": "worker", "TaskTemplate": { "ContainerSpec": { "Image": "busybox" } } }
        }
    ]"#;

    fn client(url: &str) -> SwarmClient {
        SwarmClient::new(url, None, Duration::from_secs(5)).unwrap()
    }

    fn intent() -> UpdateIntent {
        UpdateIntent {
            restart_policy: RestartPolicy {
                condition: RestartCondition::Any,
                delay_ns: 10_000_000_000,
                max_attempts: 0,
                window_ns: 10_000_000_000,
            },
            update_config: UpdateConfig {
                parallelism: 1,
                delay_ns: 10_000_000_000,
                order: UpdateOrder::StopFirst,
                failure_action: FailureAction::Pause,
                monitor_ns: 5_000_000_000,
                max_failure_ratio: 0.0,
            },
        }
    }

    #[test]
    fn api_version_becomes_path_prefix() {
        let c = SwarmClient::new("tcp://h:2375", Some("1.43"), Duration::from_secs(1)).unwrap();
        assert_eq!(c.endpoint(), "http://h:2375/v1.43");
        let c = SwarmClient::new("http://h:2375", Some("v1.41"), Duration::from_secs(1)).unwrap();
        assert_eq!(c.endpoint(), "http://h:2375/v1.41");
        let c = SwarmClient::new("http://h:2375", Some(" "), Duration::from_secs(1)).unwrap();
        assert_eq!(c.endpoint(), "http://h:2375");
        let c = SwarmClient::new("unix:///run/docker.sock", Some("1.44"), Duration::from_secs(1))
            .unwrap();
        assert_eq!(c.endpoint(), "unix:///run/docker.sock/v1.44");
        assert!(matches!(
            SwarmClient::new("npipe:////./pipe/docker_engine", None, Duration::from_secs(1)),
            Err(SwarmApiError::UnsupportedHost(_))
        ));
    }

    #[tokio::test]
    async fn list_services_decodes_snapshots() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/services")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(LIST_BODY)
            .create_async()
            .await;

        let services = client(&server.url()).list_services().await.unwrap();
        mock.assert_async().await;

        assert_eq!(services.len(), 2);
        assert_eq!(services[0].name, "web");
        assert_eq!(services[0].version, Some(11));
        assert_eq!(
            services[0].restart_policy.as_ref().unwrap().delay_ns,
            Some(10_000_000_000)
        );
        assert_eq!(services[1].name, "worker");
        assert!(services[1].restart_policy.is_none());
    }

    #[tokio::test]
    async fn engine_error_message_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/services")
            .with_status(503)
            .with_body(r#"{"message":"This node is not a swarm manager."}"#)
            .create_async()
            .await;

        let err = client(&server.url()).list_services().await.unwrap_err();
        match err {
            RegistryError::Rejected { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "This node is not a swarm manager.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_engine_is_a_transport_error() {
        let err = client("http://127.0.0.1:1").list_services().await.unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Unreachable(_) | RegistryError::Timeout(_)
        ));
    }

    #[tokio::test]
    async fn garbage_list_body_is_a_decode_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/services")
            .with_status(200)
            .with_body("{not json")
            .create_async()
            .await;

        let err = client(&server.url()).list_services().await.unwrap_err();
        assert!(matches!(err, RegistryError::Decode(_)));
    }

    #[tokio::test]
    async fn update_resubmits_full_spec_at_listed_version() {
        let mut server = mockito::Server::new_async().await;
        let inspect = server
            .mock("GET", "/services/svc2")
            .with_status(200)
            .with_body(
                json!({
                    "ID": "svc2",
                    "Version": { "Index": 42 },
                    "Spec": {
                        "Name": "worker",
                        "Labels": { "tier": "batch" },
                        "TaskTemplate": {
                            "ContainerSpec": { "Image": "busybox", "Args": ["sleep", "1d"] },
                            "RestartPolicy": { "Condition": "on-failure", "Delay": 1000 }
                        },
                        "Mode": { "Replicated": { "Replicas": 5 } }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;
        let update = server
            .mock("POST", "/services/svc2/update")
            .match_query(Matcher::UrlEncoded("version".into(), "42".into()))
            .match_body(Matcher::PartialJson(json!({
                "Name": "worker",
                "Labels": { "tier": "batch" },
                "TaskTemplate": {
                    "ContainerSpec": { "Image": "busybox", "Args": ["sleep", "1d"] },
                    "RestartPolicy": { "Delay": 10_000_000_000u64 }
                },
                "Mode": { "Replicated": { "Replicas": 5 } },
                "UpdateConfig": { "Delay": 10_000_000_000u64, "Order": "stop-first" }
            })))
            .with_status(200)
            .with_body(r#"{"Warnings":null}"#)
            .create_async()
            .await;

        client(&server.url())
            .update_service("svc2", Some(42), &intent())
            .await
            .unwrap();

        inspect.assert_async().await;
        update.assert_async().await;
    }

    #[tokio::test]
    async fn update_of_vanished_service_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/services/gone")
            .with_status(404)
            .with_body(r#"{"message":"service gone not found"}"#)
            .create_async()
            .await;

        let err = client(&server.url())
            .update_service("gone", Some(1), &intent())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(id) if id == "gone"));
    }

    #[tokio::test]
    async fn rejected_update_reports_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/services/svc1")
            .with_status(200)
            .with_body(r#"{"ID":"svc1","Version":{"Index":3},"Spec":{"Name":"web"}}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/services/svc1/update")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body(r#"{"message":"update out of sequence"}"#)
            .create_async()
            .await;

        let err = client(&server.url())
            .update_service("svc1", None, &intent())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Rejected { status: 500, ref message } if message == "update out of sequence"
        ));
    }

    #[tokio::test]
    async fn update_is_refused_when_service_moved_past_listed_version() {
        let mut server = mockito::Server::new_async().await;
        // Listed at 7; someone set MaxAttempts before the enforcer got to it.
        server
            .mock("GET", "/services/svc1")
            .with_status(200)
            .with_body(
                json!({
                    "ID": "svc1",
                    "Version": { "Index": 8 },
                    "Spec": {
                        "Name": "web",
                        "TaskTemplate": { "RestartPolicy": { "Delay": 1, "MaxAttempts": 5 } }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;
        let update = server
            .mock("POST", "/services/svc1/update")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let err = client(&server.url())
            .update_service("svc1", Some(7), &intent())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RegistryError::Conflict { ref id, listed: 7, current: 8 } if id == "svc1"
        ));
        update.assert_async().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn lists_services_over_a_unix_socket() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::UnixListener;

        let dir = tempfile::TempDir::new().unwrap();
        let socket = dir.path().join("docker.sock");
        let listener = UnixListener::bind(&socket).unwrap();

        let engine = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).await.unwrap();
                assert!(n > 0, "client closed before sending a request");
                head.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{LIST_BODY}",
                LIST_BODY.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            String::from_utf8(head).unwrap()
        });

        let host = format!("unix://{}", socket.display());
        let c = SwarmClient::new(&host, Some("1.43"), Duration::from_secs(5)).unwrap();
        let services = c.list_services().await.unwrap();
        let request = engine.await.unwrap();

        assert!(request.starts_with("GET /v1.43/services HTTP/1.1\r\n"));
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].name, "web");
        assert_eq!(services[0].version, Some(11));
    }
}
