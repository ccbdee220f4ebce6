//! rTorrent client (XML-RPC over SCGI).
//!
//! # Design
//! - Every call opens a fresh SCGI connection; rTorrent closes it after one
//!   response.
//! - The torrent list comes from a single `d.multicall2` over the `main` view.
//!   Apply-to-all actions use the same multicall with the action command.

mod normalize;
pub mod scgi;
pub mod xmlrpc;

use std::time::Duration;

use async_trait::async_trait;
use seedwatch_core::{BackendError, BackendResult, StatusRecord, TorrentBackend, TorrentRecord};
use tracing::{debug, warn};

use crate::registry::BackendOptions;
use scgi::ScgiAddress;
use xmlrpc::{XmlRpcError, XmlValue};

const VIEW: &str = "main";

/// Client for an rTorrent daemon.
#[derive(Debug, Clone)]
pub struct RtorrentClient {
    address: ScgiAddress,
    endpoint: String,
    timeout: Duration,
}

impl RtorrentClient {
    /// Registry name.
    pub const NAME: &'static str = "rtorrent";
    /// Address used when none is configured.
    pub const DEFAULT_ENDPOINT: &'static str = "scgi://127.0.0.1:5000";

    /// Build a client for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error when the endpoint is neither `host:port` nor a socket path.
    pub fn new(options: &BackendOptions) -> BackendResult<Self> {
        let endpoint = options.endpoint_or(Self::DEFAULT_ENDPOINT);
        let address = ScgiAddress::parse(endpoint).ok_or_else(|| {
            BackendError::invalid_endpoint(endpoint, "expected scgi://host:port or a socket path")
        })?;
        Ok(Self {
            address,
            endpoint: endpoint.to_string(),
            timeout: options.timeout,
        })
    }

    /// Parsed daemon address.
    #[must_use]
    pub const fn address(&self) -> &ScgiAddress {
        &self.address
    }

    async fn call(
        &self,
        operation: &'static str,
        method: &str,
        params: &[XmlValue],
    ) -> BackendResult<XmlValue> {
        let body = xmlrpc::encode_call(method, params);
        let raw = scgi::exchange(&self.address, body.as_bytes(), self.timeout)
            .await
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::TimedOut {
                    BackendError::Timeout {
                        operation,
                        after: self.timeout,
                    }
                } else {
                    BackendError::connection(operation, self.endpoint.as_str(), err)
                }
            })?;
        let text = std::str::from_utf8(scgi::response_body(&raw))
            .map_err(|_| BackendError::protocol(operation, "response is not UTF-8"))?;
        xmlrpc::decode_response(text).map_err(|err| {
            if let XmlRpcError::Fault { code, .. } = &err {
                warn!(operation, method, code, "rtorrent returned a fault");
            }
            BackendError::protocol(operation, err.to_string())
        })
    }

    async fn rate(&self, method: &'static str) -> BackendResult<u64> {
        let value = self.call("status", method, &[XmlValue::from("")]).await?;
        value
            .as_i64()
            .and_then(|rate| u64::try_from(rate).ok())
            .ok_or_else(|| BackendError::protocol("status", format!("{method} is not a rate")))
    }

    async fn act(&self, operation: &'static str, command: &str, id: Option<&str>) -> BackendResult<()> {
        match id {
            Some(hash) => self.call(operation, command, &[XmlValue::from(hash)]).await?,
            None => {
                let each = format!("{command}=");
                self.call(
                    operation,
                    "d.multicall2",
                    &[XmlValue::from(""), XmlValue::from(VIEW), XmlValue::from(each.as_str())],
                )
                .await?
            }
        };
        Ok(())
    }
}

#[async_trait]
impl TorrentBackend for RtorrentClient {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn status(&self) -> BackendResult<StatusRecord> {
        Ok(StatusRecord {
            global_download_rate: self.rate("throttle.global_down.rate").await?,
            global_upload_rate: self.rate("throttle.global_up.rate").await?,
        })
    }

    async fn torrents(&self) -> BackendResult<Vec<TorrentRecord>> {
        let mut params = vec![XmlValue::from(""), XmlValue::from(VIEW)];
        params.extend(normalize::ROW_FIELDS.iter().copied().map(XmlValue::from));
        let value = self.call("torrents", "d.multicall2", &params).await?;
        let rows = value
            .as_array()
            .ok_or_else(|| BackendError::protocol("torrents", "d.multicall2 did not return a list"))?;
        Ok(rows.iter().filter_map(normalize::torrent).collect())
    }

    async fn start(&self, id: Option<&str>) -> BackendResult<()> {
        self.act("start", "d.start", id).await
    }

    async fn stop(&self, id: Option<&str>) -> BackendResult<()> {
        self.act("stop", "d.stop", id).await
    }

    async fn remove(&self, id: &str, delete_files: bool) -> BackendResult<()> {
        if delete_files {
            return Err(BackendError::Unsupported {
                operation: "remove with data",
            });
        }
        self.call("remove", "d.erase", &[XmlValue::from(id)]).await?;
        Ok(())
    }

    async fn add(&self, source: &str, download_dir: Option<&str>) -> BackendResult<()> {
        let mut params = vec![XmlValue::from(""), XmlValue::from(source)];
        if let Some(dir) = download_dir {
            params.push(XmlValue::Str(format!("d.directory.set={}", quote_argument(dir))));
        }
        self.call("add", "load.start", &params).await?;
        debug!(source, "rtorrent accepted torrent");
        Ok(())
    }
}

/// Quote a value for rTorrent's command syntax, escaping `"` and `\\`.
fn quote_argument(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        if matches!(ch, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use seedwatch_core::{FailureKind, TransferStatus};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answers each connection with the next canned body and records requests.
    fn fake_daemon(listener: TcpListener, replies: Vec<String>) -> JoinHandle<Result<Vec<String>>> {
        tokio::spawn(async move {
            let mut requests = Vec::new();
            for reply in replies {
                let (mut socket, _) = listener.accept().await?;
                let request = read_request(&mut socket).await?;
                requests.push(request);
                let response = format!("Status: 200 OK\r\nContent-Type: text/xml\r\n\r\n{reply}");
                socket.write_all(response.as_bytes()).await?;
                socket.shutdown().await?;
            }
            Ok::<_, anyhow::Error>(requests)
        })
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> Result<String> {
        let mut buffer = Vec::new();
        let mut chunk = [0_u8; 4096];
        loop {
            let read = socket.read(&mut chunk).await?;
            if read == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..read]);
            if buffer.ends_with(b"</methodCall>") {
                break;
            }
        }
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    fn reply(value: &str) -> String {
        format!("<?xml version=\"1.0\"?><methodResponse><params><param><value>{value}</value></param></params></methodResponse>")
    }

    async fn client_with(replies: Vec<String>) -> Result<(RtorrentClient, JoinHandle<Result<Vec<String>>>)> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let options = BackendOptions {
            endpoint: Some(format!("scgi://{}", listener.local_addr()?)),
            timeout: Duration::from_secs(2),
            ..BackendOptions::default()
        };
        let client = RtorrentClient::new(&options)?;
        Ok((client, fake_daemon(listener, replies)))
    }

    #[tokio::test]
    async fn torrents_use_one_multicall() -> Result<()> {
        let rows = "<array><data>\
            <value><array><data>\
            <value><string>HASH1</string></value><value><string>one.iso</string></value>\
            <value><i8>1</i8></value><value><i8>0</i8></value><value><i8>100</i8></value>\
            <value><i8>50</i8></value><value><i8>0</i8></value><value><i8>10</i8></value>\
            <value><i8>0</i8></value><value><i8>2</i8></value><value><i8>1</i8></value>\
            <value><i8>0</i8></value>\
            </data></array></value>\
            <value><string>garbage</string></value>\
            </data></array>";
        let (client, daemon) = client_with(vec![reply(rows)]).await?;

        let torrents = client.torrents().await?;
        let requests = daemon.await??;

        assert_eq!(torrents.len(), 1);
        assert_eq!(torrents[0].id, "HASH1");
        assert_eq!(torrents[0].status, TransferStatus::Downloading);
        assert_eq!(torrents[0].estimated_time, Some(5));
        assert!(requests[0].contains("<methodName>d.multicall2</methodName>"));
        assert!(requests[0].contains("<string>d.ratio=</string>"));
        Ok(())
    }

    #[tokio::test]
    async fn status_reads_both_throttles() -> Result<()> {
        let (client, daemon) =
            client_with(vec![reply("<i8>2048</i8>"), reply("<i4>512</i4>")]).await?;

        let status = client.status().await?;
        let requests = daemon.await??;

        assert_eq!(status.global_download_rate, 2048);
        assert_eq!(status.global_upload_rate, 512);
        assert!(requests[0].contains("throttle.global_down.rate"));
        assert!(requests[1].contains("throttle.global_up.rate"));
        Ok(())
    }

    #[tokio::test]
    async fn start_all_uses_multicall_and_start_one_targets_hash() -> Result<()> {
        let (client, daemon) = client_with(vec![reply("<i4>0</i4>"), reply("<i4>0</i4>")]).await?;

        client.start(None).await?;
        client.stop(Some("HASH9")).await?;
        let requests = daemon.await??;

        assert!(requests[0].contains("<string>d.start=</string>"));
        assert!(requests[1].contains("<methodName>d.stop</methodName>"));
        assert!(requests[1].contains("<string>HASH9</string>"));
        Ok(())
    }

    #[tokio::test]
    async fn fault_is_protocol_failure() -> Result<()> {
        let fault = "<?xml version=\"1.0\"?><methodResponse><fault><value><struct>\
            <member><name>faultCode</name><value><i4>-501</i4></value></member>\
            <member><name>faultString</name><value><string>Could not find info-hash.</string></value></member>\
            </struct></value></fault></methodResponse>";
        let (client, _daemon) = client_with(vec![fault.to_string()]).await?;

        let err = client
            .remove("MISSING", false)
            .await
            .err()
            .ok_or_else(|| anyhow::anyhow!("expected fault"))?;
        assert_eq!(err.kind(), FailureKind::ProtocolFailure);
        assert!(err.to_string().contains("Could not find info-hash."));
        Ok(())
    }

    #[tokio::test]
    async fn remove_with_data_is_unsupported() -> Result<()> {
        let client = RtorrentClient::new(&BackendOptions::default())?;
        let result = client.remove("HASH", true).await;
        assert!(matches!(result, Err(BackendError::Unsupported { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn add_passes_directory_command() -> Result<()> {
        let (client, daemon) = client_with(vec![reply("<i4>0</i4>")]).await?;

        client.add("http://example.com/a.torrent", Some("/data")).await?;
        let requests = daemon.await??;

        assert!(requests[0].contains("<methodName>load.start</methodName>"));
        assert!(requests[0].contains("d.directory.set=\"/data\""));
        Ok(())
    }

    #[test]
    fn directory_arguments_are_quoted() {
        assert_eq!(quote_argument("/data"), "\"/data\"");
        assert_eq!(
            quote_argument(r#"/mnt/my "films"\new"#),
            r#""/mnt/my \"films\"\\new""#
        );
    }

    #[tokio::test]
    async fn refused_connection_is_connection_failure() -> Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let endpoint = listener.local_addr()?.to_string();
        drop(listener);
        let client = RtorrentClient::new(&BackendOptions {
            endpoint: Some(endpoint),
            ..BackendOptions::default()
        })?;

        let err = client
            .torrents()
            .await
            .err()
            .ok_or_else(|| anyhow::anyhow!("expected failure"))?;
        assert_eq!(err.kind(), FailureKind::ConnectionFailure);
        Ok(())
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        let options = BackendOptions {
            endpoint: Some("localhost".to_string()),
            ..BackendOptions::default()
        };
        assert!(matches!(
            RtorrentClient::new(&options),
            Err(BackendError::InvalidEndpoint { .. })
        ));
    }
}
