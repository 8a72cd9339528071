//! Connectivity probes

use async_trait::async_trait;
use std::time::Duration;

/// A single reachability check against an endpoint
///
/// Implementations must not fail: any error is reported as `false`.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn probe(&self, endpoint: &str, timeout: Duration) -> bool;
}

/// HEAD request probe
///
/// Any response below 500 counts as reachable, including 401/404: the
/// endpoint answered. Server errors, timeouts and connection failures count
/// as offline.
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectivityProbe for HttpProbe {
    async fn probe(&self, endpoint: &str, timeout: Duration) -> bool {
        match self.client.head(endpoint).timeout(timeout).send().await {
            Ok(response) => !response.status().is_server_error(),
            Err(e) => {
                log::debug!("Probe of {} failed: {}", endpoint, e);
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

    /// Serve `count` connections with a fixed status line, return the base URL
    async fn serve_status(status_line: &'static str, count: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for _ in 0..count {
                let Ok((mut socket, _)) = listener.accept().await else { return };
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let response =
                    format!("HTTP/1.1 {}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n", status_line);
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{}/health", addr)
    }

    #[tokio::test]
    async fn ok_and_client_errors_are_online() {
        let probe = HttpProbe::new();
        let ok = serve_status("200 OK", 1).await;
        assert!(probe.probe(&ok, Duration::from_secs(2)).await);

        let not_found = serve_status("404 Not Found", 1).await;
        assert!(probe.probe(&not_found, Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn server_errors_are_offline() {
        let probe = HttpProbe::new();
        let url = serve_status("503 Service Unavailable", 1).await;
        assert!(!probe.probe(&url, Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn connection_refused_is_offline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let probe = HttpProbe::new();
        assert!(!probe.probe(&format!("http://{}/", addr), Duration::from_millis(500)).await);
    }
}
