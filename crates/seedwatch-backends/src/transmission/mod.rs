//! Transmission daemon client (JSON-RPC over HTTP).
//!
//! # Design
//! - The daemon guards its RPC endpoint with a CSRF session id. A 409 answer
//!   carries a fresh id in `X-Transmission-Session-Id`; the client stores it
//!   and retries the same request exactly once.
//! - Numeric ids are sent as integers and anything else (info hashes) as
//!   strings; the daemon accepts both.

mod normalize;

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderValue;
use reqwest::{Client, Response, StatusCode};
use seedwatch_core::{BackendError, BackendResult, StatusRecord, TorrentBackend, TorrentRecord};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};
use url::Url;

use crate::registry::BackendOptions;

const SESSION_HEADER: &str = "x-transmission-session-id";
const RPC_PATH: &str = "/transmission/rpc";

/// Fields requested from `torrent-get`.
const TORRENT_FIELDS: [&str; 14] = [
    "id",
    "name",
    "totalSize",
    "percentDone",
    "rateDownload",
    "rateUpload",
    "files",
    "status",
    "peersConnected",
    "peersSendingToUs",
    "peersGettingFromUs",
    "eta",
    "uploadedEver",
    "uploadRatio",
];

#[derive(Serialize)]
struct RpcRequest {
    method: &'static str,
    #[serde(skip_serializing_if = "Map::is_empty")]
    arguments: Map<String, Value>,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: String,
    #[serde(default)]
    arguments: Value,
}

/// Client for a Transmission daemon.
#[derive(Debug)]
pub struct TransmissionClient {
    http: Client,
    url: Url,
    username: Option<String>,
    password: Option<String>,
    timeout: Duration,
    session_id: Mutex<Option<String>>,
}

impl TransmissionClient {
    /// Registry name.
    pub const NAME: &'static str = "transmission";
    /// Address used when none is configured.
    pub const DEFAULT_ENDPOINT: &'static str = "http://localhost:9091";

    /// Build a client for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error when the endpoint is not a usable URL or the HTTP
    /// client cannot be constructed.
    pub fn new(options: &BackendOptions) -> BackendResult<Self> {
        let endpoint = options.endpoint_or(Self::DEFAULT_ENDPOINT);
        let url = rpc_url(endpoint)?;
        let http = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|err| BackendError::invalid_endpoint(endpoint, err.to_string()))?;
        Ok(Self {
            http,
            url,
            username: options.username.clone(),
            password: options.password.clone(),
            timeout: options.timeout,
            session_id: Mutex::new(None),
        })
    }

    /// RPC URL requests are posted to.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Session id captured from the last challenge, if any.
    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.session_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn call(
        &self,
        operation: &'static str,
        arguments: Map<String, Value>,
    ) -> BackendResult<Value> {
        let request = RpcRequest {
            method: operation,
            arguments,
        };

        let mut response = self.send(operation, &request).await?;
        if response.status() == StatusCode::CONFLICT {
            let token = session_token(&response).ok_or(BackendError::AuthChallenge { operation })?;
            debug!(operation, "captured transmission session id");
            *self
                .session_id
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(token);
            response = self.send(operation, &request).await?;
            if response.status() == StatusCode::CONFLICT {
                warn!(operation, "transmission rejected refreshed session id");
                return Err(BackendError::AuthChallenge { operation });
            }
        }

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::protocol(
                operation,
                format!("unexpected HTTP status {status}"),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| self.transport_error(operation, err))?;
        let envelope: RpcResponse = serde_json::from_slice(&body)
            .map_err(|err| BackendError::protocol(operation, format!("invalid response body: {err}")))?;
        if envelope.result != "success" {
            return Err(BackendError::protocol(
                operation,
                format!("daemon reported '{}'", envelope.result),
            ));
        }
        Ok(envelope.arguments)
    }

    async fn send(
        &self,
        operation: &'static str,
        request: &RpcRequest,
    ) -> BackendResult<Response> {
        let mut builder = self.http.post(self.url.clone()).json(request);
        if let Some(token) = self.session_id() {
            builder = builder.header(SESSION_HEADER, token);
        }
        if let Some(username) = &self.username {
            builder = builder.basic_auth(username, self.password.as_deref());
        }
        builder
            .send()
            .await
            .map_err(|err| self.transport_error(operation, err))
    }

    fn transport_error(&self, operation: &'static str, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout {
                operation,
                after: self.timeout,
            }
        } else {
            BackendError::connection(operation, self.url.as_str(), err)
        }
    }

    async fn act(&self, operation: &'static str, id: Option<&str>) -> BackendResult<()> {
        let mut arguments = Map::new();
        if let Some(id) = id {
            arguments.insert("ids".to_string(), json!([rpc_id(id)]));
        }
        self.call(operation, arguments).await.map(drop)
    }
}

#[async_trait]
impl TorrentBackend for TransmissionClient {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn status(&self) -> BackendResult<StatusRecord> {
        let arguments = self.call("session-stats", Map::new()).await?;
        Ok(normalize::status(&arguments))
    }

    async fn torrents(&self) -> BackendResult<Vec<TorrentRecord>> {
        let mut arguments = Map::new();
        arguments.insert("fields".to_string(), json!(TORRENT_FIELDS));
        let payload = self.call("torrent-get", arguments).await?;
        let torrents = payload
            .get("torrents")
            .and_then(Value::as_array)
            .ok_or_else(|| BackendError::protocol("torrent-get", "response has no torrent list"))?;
        Ok(torrents.iter().filter_map(normalize::torrent).collect())
    }

    async fn start(&self, id: Option<&str>) -> BackendResult<()> {
        self.act("torrent-start", id).await
    }

    async fn stop(&self, id: Option<&str>) -> BackendResult<()> {
        self.act("torrent-stop", id).await
    }

    async fn remove(&self, id: &str, delete_files: bool) -> BackendResult<()> {
        let mut arguments = Map::new();
        arguments.insert("ids".to_string(), json!([rpc_id(id)]));
        arguments.insert("delete-local-data".to_string(), Value::Bool(delete_files));
        self.call("torrent-remove", arguments).await.map(drop)
    }

    async fn add(&self, source: &str, download_dir: Option<&str>) -> BackendResult<()> {
        let mut arguments = Map::new();
        arguments.insert("filename".to_string(), Value::from(source));
        if let Some(dir) = download_dir {
            arguments.insert("download-dir".to_string(), Value::from(dir));
        }
        let payload = self.call("torrent-add", arguments).await?;
        if payload.get("torrent-duplicate").is_some() {
            debug!(source, "transmission already knows this torrent");
        }
        Ok(())
    }
}

/// Resolve the RPC URL for a daemon address.
///
/// A missing scheme defaults to `http`, and the RPC path is appended unless the
/// address already ends with it.
///
/// # Errors
///
/// Returns an error when the address cannot be parsed as a URL.
pub fn rpc_url(endpoint: &str) -> BackendResult<Url> {
    let trimmed = endpoint.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    let mut url = Url::parse(&with_scheme)
        .map_err(|err| BackendError::invalid_endpoint(endpoint, err.to_string()))?;
    if !url.path().trim_end_matches('/').ends_with(RPC_PATH) {
        let path = format!("{}{RPC_PATH}", url.path().trim_end_matches('/'));
        url.set_path(&path);
    }
    Ok(url)
}

fn rpc_id(id: &str) -> Value {
    id.parse::<i64>()
        .map_or_else(|_| Value::from(id), Value::from)
}

fn session_token(response: &Response) -> Option<String> {
    response
        .headers()
        .get(SESSION_HEADER)
        .and_then(|value: &HeaderValue| value.to_str().ok())
        .map(str::to_string)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use seedwatch_core::{FailureKind, TransferStatus};

    fn client_for(server: &MockServer) -> Result<TransmissionClient> {
        let options = BackendOptions {
            endpoint: Some(server.base_url()),
            timeout: Duration::from_secs(2),
            ..BackendOptions::default()
        };
        Ok(TransmissionClient::new(&options)?)
    }

    fn torrent_get_body() -> Value {
        json!({"method": "torrent-get", "arguments": {"fields": TORRENT_FIELDS}})
    }

    #[test]
    fn rpc_url_appends_path_once() -> Result<()> {
        assert_eq!(
            rpc_url("http://localhost:9091")?.as_str(),
            "http://localhost:9091/transmission/rpc"
        );
        assert_eq!(
            rpc_url("nas.local:9091/")?.as_str(),
            "http://nas.local:9091/transmission/rpc"
        );
        assert_eq!(
            rpc_url("https://box/transmission/rpc")?.as_str(),
            "https://box/transmission/rpc"
        );
        assert!(rpc_url("http://[::1").is_err());
        Ok(())
    }

    #[test]
    fn numeric_ids_are_sent_as_integers() {
        assert_eq!(rpc_id("42"), json!(42));
        assert_eq!(rpc_id("c0ffee"), json!("c0ffee"));
    }

    #[tokio::test]
    async fn session_challenge_is_retried_once_with_token() -> Result<()> {
        let server = MockServer::start_async().await;
        let challenge = server.mock(|when, then| {
            when.method(POST)
                .path("/transmission/rpc")
                .header_missing(SESSION_HEADER);
            then.status(409).header("X-Transmission-Session-Id", "token-1");
        });
        let success = server.mock(|when, then| {
            when.method(POST)
                .path("/transmission/rpc")
                .header(SESSION_HEADER, "token-1")
                .json_body(json!({"method": "session-stats"}));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "result": "success",
                    "arguments": {"downloadSpeed": 2048, "uploadSpeed": 512}
                }));
        });

        let client = client_for(&server)?;
        let status = client.status().await?;

        challenge.assert();
        success.assert();
        assert_eq!(status.global_download_rate, 2048);
        assert_eq!(status.global_upload_rate, 512);
        assert_eq!(client.session_id().as_deref(), Some("token-1"));
        Ok(())
    }

    #[tokio::test]
    async fn repeated_challenge_is_auth_failure() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/transmission/rpc");
            then.status(409).header("X-Transmission-Session-Id", "token-2");
        });

        let client = client_for(&server)?;
        let err = client.status().await.err().ok_or_else(|| anyhow::anyhow!("expected failure"))?;
        assert_eq!(err.kind(), FailureKind::AuthChallenge);
        Ok(())
    }

    #[tokio::test]
    async fn challenge_without_token_is_auth_failure() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/transmission/rpc");
            then.status(409);
        });

        let client = client_for(&server)?;
        let result = client.torrents().await;
        assert!(matches!(result, Err(BackendError::AuthChallenge { operation: "torrent-get" })));
        Ok(())
    }

    #[tokio::test]
    async fn torrents_are_normalised() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/transmission/rpc")
                .json_body(torrent_get_body());
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "result": "success",
                    "arguments": {"torrents": [
                        {
                            "id": 7,
                            "name": "debian.iso",
                            "status": 4,
                            "totalSize": 1000,
                            "percentDone": 0.25,
                            "files": [{"bytesCompleted": 200}, {"bytesCompleted": 50}],
                            "peersConnected": 5,
                            "peersSendingToUs": 3,
                            "peersGettingFromUs": 1,
                            "rateDownload": 4096,
                            "rateUpload": 128,
                            "eta": 600,
                            "uploadedEver": 10,
                            "uploadRatio": 0.04
                        },
                        {"name": "no id"},
                        {"id": 8, "name": "ubuntu.iso", "status": 8, "percentDone": 1.0000001}
                    ]}
                }));
        });

        let client = client_for(&server)?;
        let torrents = client.torrents().await?;
        mock.assert();

        assert_eq!(torrents.len(), 2);
        let first = &torrents[0];
        assert_eq!(first.id, "7");
        assert_eq!(first.status, TransferStatus::Downloading);
        assert_eq!(first.size_downloaded, 250);
        assert!((first.percent_done - 25.0).abs() < f64::EPSILON);
        assert_eq!(first.estimated_time, Some(600));
        assert_eq!(torrents[1].status, TransferStatus::Seeding);
        assert!((torrents[1].percent_done - 100.0).abs() < f64::EPSILON);
        Ok(())
    }

    #[tokio::test]
    async fn start_all_omits_ids_and_remove_sends_flag() -> Result<()> {
        let server = MockServer::start_async().await;
        let start_all = server.mock(|when, then| {
            when.method(POST)
                .path("/transmission/rpc")
                .json_body(json!({"method": "torrent-start"}));
            then.status(200).json_body(json!({"result": "success", "arguments": {}}));
        });
        let remove = server.mock(|when, then| {
            when.method(POST).path("/transmission/rpc").json_body(json!({
                "method": "torrent-remove",
                "arguments": {"ids": [3], "delete-local-data": true}
            }));
            then.status(200).json_body(json!({"result": "success", "arguments": {}}));
        });

        let client = client_for(&server)?;
        client.start(None).await?;
        client.remove("3", true).await?;

        start_all.assert();
        remove.assert();
        Ok(())
    }

    #[tokio::test]
    async fn daemon_error_result_is_protocol_failure() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/transmission/rpc");
            then.status(200)
                .json_body(json!({"result": "duplicate torrent", "arguments": {}}));
        });

        let client = client_for(&server)?;
        let err = client
            .add("magnet:?xt=urn:btih:abc", Some("/downloads"))
            .await
            .err()
            .ok_or_else(|| anyhow::anyhow!("expected failure"))?;
        assert_eq!(err.kind(), FailureKind::ProtocolFailure);
        assert!(err.to_string().contains("duplicate torrent"));
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_daemon_is_connection_failure() -> Result<()> {
        let options = BackendOptions {
            endpoint: Some("http://127.0.0.1:9".to_string()),
            timeout: Duration::from_secs(2),
            ..BackendOptions::default()
        };
        let client = TransmissionClient::new(&options)?;
        let err = client.status().await.err().ok_or_else(|| anyhow::anyhow!("expected failure"))?;
        assert_eq!(err.kind(), FailureKind::ConnectionFailure);
        Ok(())
    }
}
