//! Deck Snapshot Fetchers
//!
//! Request/response access to full presentation documents:
//! - Memory (default): in-process table for tests and demos
//! - HTTP: the presentation REST API

#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "http")]
pub mod http;

use async_trait::async_trait;
use deck_core::{Presentation, PresentationId};

/// Snapshot fetcher trait
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    /// List every presentation (lobby view)
    async fn get_all(&self) -> Result<Vec<Presentation>, SnapshotError>;

    /// Fetch one full presentation document
    async fn get_by_id(&self, id: &PresentationId) -> Result<Presentation, SnapshotError>;

    /// Upload an image onto a slide.
    ///
    /// `connection_id` ties the upload to the caller's live realtime
    /// connection so the resulting `ElementAdded` is attributed to it.
    async fn upload_image(
        &self,
        presentation_id: &PresentationId,
        slide_id: &str,
        file: ImageUpload,
        connection_id: &str,
    ) -> Result<(), SnapshotError>;
}

/// Snapshot error types
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Presentation not found: {0}")]
    NotFound(String),

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),
}

/// An image file to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Build an upload, inferring the content type from the file extension
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[cfg(feature = "memory")]
pub use memory::MemorySnapshots;
#[cfg(feature = "http")]
pub use http::HttpSnapshotFetcher;
