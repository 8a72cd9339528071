//! Remote schema store adapter

use crate::config::RemoteConfig;
use crate::schema::Schema;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Acknowledgement of a stored schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushReceipt {
    pub id: String,
    pub version: String,
}

/// Where remote schemas live
#[async_trait]
pub trait SchemaRemote: Send + Sync {
    /// Latest stored schema, `None` when the service has none yet
    async fn get_latest_schema(&self, service_id: &str) -> Result<Option<Schema>>;

    async fn push_schema(&self, service_id: &str, schema: &Schema) -> Result<PushReceipt>;
}

/// JSON over HTTP
///
/// - `GET  {base}/services/{id}/schema/latest` (404 means no schema yet)
/// - `POST {base}/services/{id}/schema`
pub struct HttpSchemaRemote {
    client: reqwest::Client,
    base_url: reqwest::Url,
    token: Option<String>,
}

impl HttpSchemaRemote {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        let base_url = reqwest::Url::parse(&config.base_url)
            .with_context(|| format!("Invalid remote base URL {}", config.base_url))?;
        Ok(Self { client, base_url, token: config.token.clone() })
    }

    /// Service ids are pushed as single escaped path segments
    fn url(&self, service_id: &str, latest: bool) -> Result<reqwest::Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow::anyhow!("Remote base URL {} cannot hold a path", self.base_url))?;
            segments.pop_if_empty().extend(["services", service_id, "schema"]);
            if latest {
                segments.push("latest");
            }
        }
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl SchemaRemote for HttpSchemaRemote {
    async fn get_latest_schema(&self, service_id: &str) -> Result<Option<Schema>> {
        let url = self.url(service_id, true)?;
        log::debug!("GET {}", url);

        let response = self
            .authorize(self.client.get(url.clone()))
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            bail!("Remote returned {} for {}", status, url);
        }

        let schema = response
            .json::<Schema>()
            .await
            .with_context(|| format!("Invalid schema document from {}", url))?;
        Ok(Some(schema))
    }

    async fn push_schema(&self, service_id: &str, schema: &Schema) -> Result<PushReceipt> {
        let url = self.url(service_id, false)?;
        log::debug!("POST {}", url);

        let response = self
            .authorize(self.client.post(url.clone()))
            .json(schema)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?;

        let status = response.status();
        if !status.is_success() {
            bail!("Remote rejected schema with {} for {}", status, url);
        }

        response
            .json::<PushReceipt>()
            .await
            .with_context(|| format!("Invalid push receipt from {}", url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Entity, Field, FieldType};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Read one request (headers plus content-length body)
    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&data).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let content_length = text[..end]
                    .lines()
                    .find_map(|l| {
                        let lower = l.to_ascii_lowercase();
                        lower.strip_prefix("content-length:").map(|v| v.trim().parse().unwrap_or(0))
                    })
                    .unwrap_or(0usize);
                if data.len() >= end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&data).to_string()
    }

    /// Answer one request with `status` and `body`; the request text is sent back
    async fn serve_once(status: &'static str, body: String) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let Ok((mut socket, _)) = listener.accept().await else { return };
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
            let _ = tx.send(request);
        });
        (format!("http://{}/v1", addr), rx)
    }

    fn remote_for(base_url: String, token: Option<&str>) -> HttpSchemaRemote {
        let config = RemoteConfig {
            base_url,
            token: token.map(str::to_string),
            request_timeout_secs: 5,
        };
        HttpSchemaRemote::new(&config).unwrap()
    }

    fn sample() -> Schema {
        Schema::default()
            .with_entity(Entity::new("User").with_field(Field::new("id", FieldType::Uuid)))
    }

    #[tokio::test]
    async fn fetches_latest_schema() {
        let body = serde_json::to_string(&sample()).unwrap();
        let (base, request) = serve_once("200 OK", body).await;

        let schema = remote_for(base, Some("tok")).get_latest_schema("svc_1").await.unwrap();
        assert_eq!(schema, Some(sample()));

        let request = request.await.unwrap().to_ascii_lowercase();
        assert!(request.starts_with("get /v1/services/svc_1/schema/latest "));
        assert!(request.contains("authorization: bearer tok"));
    }

    #[tokio::test]
    async fn missing_schema_is_none() {
        let (base, _request) = serve_once("404 Not Found", String::new()).await;
        let schema = remote_for(base, None).get_latest_schema("svc_1").await.unwrap();
        assert!(schema.is_none());
    }

    #[tokio::test]
    async fn pushes_schema_and_parses_receipt() {
        let (base, request) =
            serve_once("201 Created", r#"{"id":"sch_42","version":"3"}"#.to_string()).await;

        let receipt = remote_for(base, None).push_schema("svc_1", &sample()).await.unwrap();
        assert_eq!(receipt, PushReceipt { id: "sch_42".into(), version: "3".into() });

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /v1/services/svc_1/schema "));
        assert!(request.contains("\"User\""));
    }

    #[test]
    fn service_id_cannot_change_the_request_target() {
        let remote = remote_for("https://api.example.com/v1/".to_string(), None);
        assert_eq!(
            remote.url("svc_1", true).unwrap().as_str(),
            "https://api.example.com/v1/services/svc_1/schema/latest"
        );
        assert_eq!(
            remote.url("a/../b?c#d", false).unwrap().as_str(),
            "https://api.example.com/v1/services/a%2F..%2Fb%3Fc%23d/schema"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let config = RemoteConfig { base_url: "not a url".into(), ..RemoteConfig::default() };
        assert!(HttpSchemaRemote::new(&config).is_err());
    }

    #[tokio::test]
    async fn server_error_is_reported() {
        let (base, _request) = serve_once("500 Internal Server Error", "{}".to_string()).await;
        let err = remote_for(base, None).push_schema("svc_1", &sample()).await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
