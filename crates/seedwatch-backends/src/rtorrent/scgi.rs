//! SCGI framing and a one-shot request/response exchange.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

/// Where the daemon's SCGI listener lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScgiAddress {
    /// `host:port` of a TCP listener.
    Tcp(String),
    /// Filesystem path of a unix socket.
    #[cfg(unix)]
    Unix(std::path::PathBuf),
}

impl ScgiAddress {
    /// Parse `scgi://host:port`, `host:port`, or (on unix) an absolute socket
    /// path optionally prefixed with `unix://`.
    ///
    /// Returns `None` for an empty address or a TCP address without a port.
    #[must_use]
    pub fn parse(endpoint: &str) -> Option<Self> {
        let trimmed = endpoint.trim();
        #[cfg(unix)]
        {
            let path = trimmed.strip_prefix("unix://").unwrap_or(trimmed);
            if path.starts_with('/') {
                return Some(Self::Unix(path.into()));
            }
        }
        let authority = trimmed
            .strip_prefix("scgi://")
            .unwrap_or(trimmed)
            .trim_end_matches('/');
        let (host, port) = authority.rsplit_once(':')?;
        if host.is_empty() || port.parse::<u16>().is_err() {
            return None;
        }
        Some(Self::Tcp(authority.to_string()))
    }
}

/// Wrap an XML-RPC body in an SCGI request.
#[must_use]
pub fn frame_request(body: &[u8]) -> Vec<u8> {
    let headers = format!(
        "CONTENT_LENGTH\0{}\0SCGI\01\0REQUEST_METHOD\0POST\0REQUEST_URI\0/RPC2\0",
        body.len()
    );
    let mut framed = format!("{}:{headers},", headers.len()).into_bytes();
    framed.extend_from_slice(body);
    framed
}

/// Strip the CGI-style header block from a response.
///
/// Daemons that answer without headers are tolerated; the body is returned as is.
#[must_use]
pub fn response_body(raw: &[u8]) -> &[u8] {
    for separator in [&b"\r\n\r\n"[..], &b"\n\n"[..]] {
        if let Some(index) = raw
            .windows(separator.len())
            .position(|window| window == separator)
        {
            let head = &raw[..index];
            if !head.starts_with(b"<") {
                return &raw[index + separator.len()..];
            }
        }
    }
    raw
}

/// Send one framed request and read the whole response.
///
/// # Errors
///
/// Returns an IO error when connecting, writing or reading fails, or
/// [`io::ErrorKind::TimedOut`] when the exchange exceeds `timeout`.
pub async fn exchange(address: &ScgiAddress, body: &[u8], timeout: Duration) -> io::Result<Vec<u8>> {
    let request = frame_request(body);
    let work = async {
        match address {
            ScgiAddress::Tcp(authority) => {
                let stream = TcpStream::connect(authority.as_str()).await?;
                round_trip(stream, &request).await
            }
            #[cfg(unix)]
            ScgiAddress::Unix(path) => {
                let stream = tokio::net::UnixStream::connect(path).await?;
                round_trip(stream, &request).await
            }
        }
    };
    tokio::time::timeout(timeout, work)
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "scgi exchange timed out"))?
}

async fn round_trip<S>(mut stream: S, request: &[u8]) -> io::Result<Vec<u8>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(request).await?;
    stream.flush().await?;
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await?;
    Ok(response)
}
