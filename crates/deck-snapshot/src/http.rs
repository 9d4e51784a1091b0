//! HTTP snapshot backend
//!
//! Talks to the presentation REST API:
//! - `GET  {base}/api/presentations`
//! - `GET  {base}/api/presentations/{id}`
//! - `POST {base}/api/presentations/{id}/slides/{slideId}/images` (multipart)

use crate::{ImageUpload, SnapshotError, SnapshotFetcher};
use async_trait::async_trait;
use deck_core::{Presentation, PresentationId};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, warn};

/// REST-backed snapshot fetcher
#[derive(Debug, Clone)]
pub struct HttpSnapshotFetcher {
    client: Client,
    base_url: String,
}

impl HttpSnapshotFetcher {
    /// Create a fetcher for the API rooted at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Create a fetcher sharing an existing client
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn presentations_url(&self) -> String {
        format!("{}/api/presentations", self.base_url)
    }

    async fn check(response: Response, what: &str) -> Result<Response, SnapshotError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(SnapshotError::NotFound(what.to_string()));
        }

        let message = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), resource = what, "Snapshot request failed");
        Err(SnapshotError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl SnapshotFetcher for HttpSnapshotFetcher {
    async fn get_all(&self) -> Result<Vec<Presentation>, SnapshotError> {
        let url = self.presentations_url();
        debug!(url = %url, "Fetching presentation list");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SnapshotError::Http(e.to_string()))?;
        let response = Self::check(response, "presentations").await?;

        response
            .json()
            .await
            .map_err(|e| SnapshotError::InvalidResponse(e.to_string()))
    }

    async fn get_by_id(&self, id: &PresentationId) -> Result<Presentation, SnapshotError> {
        let url = format!("{}/{}", self.presentations_url(), id);
        debug!(url = %url, "Fetching presentation snapshot");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SnapshotError::Http(e.to_string()))?;
        let response = Self::check(response, id.as_str()).await?;

        response
            .json()
            .await
            .map_err(|e| SnapshotError::InvalidResponse(e.to_string()))
    }

    async fn upload_image(
        &self,
        presentation_id: &PresentationId,
        slide_id: &str,
        file: ImageUpload,
        connection_id: &str,
    ) -> Result<(), SnapshotError> {
        let url = format!(
            "{}/{}/slides/{}/images",
            self.presentations_url(),
            presentation_id,
            slide_id
        );
        debug!(url = %url, bytes = file.bytes.len(), "Uploading image");

        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.content_type)
            .map_err(|e| SnapshotError::InvalidUpload(e.to_string()))?;
        let form = Form::new()
            .part("file", part)
            .text("connectionId", connection_id.to_string());

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SnapshotError::Http(e.to_string()))?;
        Self::check(response, slide_id).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and return the request head it received
    async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let mut request = Vec::new();
            loop {
                let n = stream.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });

        (format!("http://{}/", addr), handle)
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"id":"p1","title":"Demo","creatorName":"alice","slides":[{"id":"s1","order":0,"elements":[]}]}"#,
        )
        .await;

        let fetcher = HttpSnapshotFetcher::new(base);
        let presentation = fetcher
            .get_by_id(&PresentationId::new("p1").unwrap())
            .await
            .unwrap();

        assert_eq!(presentation.creator_name, "alice");
        assert_eq!(presentation.slides.len(), 1);

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/presentations/p1 "));
    }

    #[tokio::test]
    async fn test_get_by_id_null_elements() {
        let (base, _server) = serve_once(
            "200 OK",
            r#"{"id":"p1","title":"Demo","creatorName":"alice","slides":[{"id":"s1","order":0,"elements":null}]}"#,
        )
        .await;

        let fetcher = HttpSnapshotFetcher::new(base);
        let presentation = fetcher
            .get_by_id(&PresentationId::new("p1").unwrap())
            .await
            .unwrap();

        assert_eq!(presentation.slides.len(), 1);
        assert!(presentation.slides[0].elements.is_empty());
    }

    #[tokio::test]
    async fn test_not_found() {
        let (base, _server) = serve_once("404 Not Found", "").await;

        let fetcher = HttpSnapshotFetcher::new(base);
        let result = fetcher.get_by_id(&PresentationId::new("p9").unwrap()).await;

        assert!(matches!(result, Err(SnapshotError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_server_error_status() {
        let (base, _server) = serve_once("500 Internal Server Error", "boom").await;

        let fetcher = HttpSnapshotFetcher::new(base);
        let result = fetcher.get_all().await;

        assert!(matches!(result, Err(SnapshotError::Status { status: 500, .. })));
    }

    #[test]
    fn test_base_url_normalized() {
        let fetcher = HttpSnapshotFetcher::new("http://localhost:5000/");
        assert_eq!(fetcher.base_url(), "http://localhost:5000");
    }
}
