//! Directory service health probe

use armada_core_interface::{CapabilityError, DirectoryProbe};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Health endpoint of the directory service, relative to its base URL
pub const PING_PATH: &str = "/ping";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Probes `GET {base}/ping`; only a 200 counts as available
#[derive(Debug, Clone)]
pub struct HttpDirectoryProbe {
    client: reqwest::Client,
    ping_url: String,
}

impl HttpDirectoryProbe {
    pub fn new(base_url: &str) -> Result<Self, CapabilityError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| CapabilityError::Probe(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            ping_url: format!("{}{}", base_url.trim_end_matches('/'), PING_PATH),
        })
    }

    pub fn ping_url(&self) -> &str {
        &self.ping_url
    }
}

#[async_trait]
impl DirectoryProbe for HttpDirectoryProbe {
    async fn is_available(&self, timeout: Duration) -> bool {
        match self.client.get(&self.ping_url).timeout(timeout).send().await {
            Ok(resp) if resp.status() == reqwest::StatusCode::OK => true,
            Ok(resp) => {
                warn!("Directory {} answered {}", self.ping_url, resp.status());
                false
            }
            Err(e) => {
                debug!("Directory {} unreachable: {}", self.ping_url, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response per connection
    async fn serve(status_line: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    status_line
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_ping_url() {
        let probe = HttpDirectoryProbe::new("http://directory.test:8080/").unwrap();
        assert_eq!(probe.ping_url(), "http://directory.test:8080/ping");
    }

    #[tokio::test]
    async fn test_ok_is_available() {
        let base = serve("200 OK").await;
        let probe = HttpDirectoryProbe::new(&base).unwrap();
        assert!(probe.is_available(Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn test_error_status_is_unavailable() {
        let base = serve("503 Service Unavailable").await;
        let probe = HttpDirectoryProbe::new(&base).unwrap();
        assert!(!probe.is_available(Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn test_refused_connection_is_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let probe = HttpDirectoryProbe::new(&base).unwrap();
        assert!(!probe.is_available(Duration::from_secs(2)).await);
    }
}
