//! In-memory snapshot backend

use crate::{ImageUpload, SnapshotError, SnapshotFetcher};
use async_trait::async_trait;
use dashmap::DashMap;
use deck_core::{Presentation, PresentationId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// An upload accepted by [`MemorySnapshots`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    pub presentation_id: PresentationId,
    pub slide_id: String,
    pub file: ImageUpload,
    pub connection_id: String,
}

/// In-memory presentation table
///
/// Serves whatever documents were inserted; suitable for tests and demos.
pub struct MemorySnapshots {
    /// Presentations by id
    presentations: DashMap<String, Presentation>,
    /// Accepted uploads, in arrival order
    uploads: Mutex<Vec<RecordedUpload>>,
    /// Number of `get_by_id` calls served
    fetches: AtomicUsize,
}

impl MemorySnapshots {
    pub fn new() -> Self {
        Self {
            presentations: DashMap::new(),
            uploads: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Insert or replace a presentation
    pub fn insert(&self, presentation: Presentation) {
        self.presentations
            .insert(presentation.id.as_str().to_string(), presentation);
    }

    /// Mutate a stored presentation in place; returns false if it is unknown
    pub fn modify<F>(&self, id: &PresentationId, f: F) -> bool
    where
        F: FnOnce(&mut Presentation),
    {
        match self.presentations.get_mut(id.as_str()) {
            Some(mut entry) => {
                f(entry.value_mut());
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: &PresentationId) -> Option<Presentation> {
        self.presentations.remove(id.as_str()).map(|(_, p)| p)
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl Default for MemorySnapshots {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotFetcher for MemorySnapshots {
    async fn get_all(&self) -> Result<Vec<Presentation>, SnapshotError> {
        let mut all: Vec<Presentation> = self
            .presentations
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(all)
    }

    async fn get_by_id(&self, id: &PresentationId) -> Result<Presentation, SnapshotError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.presentations
            .get(id.as_str())
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SnapshotError::NotFound(id.to_string()))
    }

    async fn upload_image(
        &self,
        presentation_id: &PresentationId,
        slide_id: &str,
        file: ImageUpload,
        connection_id: &str,
    ) -> Result<(), SnapshotError> {
        if file.bytes.is_empty() {
            return Err(SnapshotError::InvalidUpload("empty file".into()));
        }

        let slide_known = self
            .presentations
            .get(presentation_id.as_str())
            .map(|p| p.slides.iter().any(|s| s.id == slide_id))
            .ok_or_else(|| SnapshotError::NotFound(presentation_id.to_string()))?;
        if !slide_known {
            return Err(SnapshotError::NotFound(format!("{}/{}", presentation_id, slide_id)));
        }

        self.uploads.lock().push(RecordedUpload {
            presentation_id: presentation_id.clone(),
            slide_id: slide_id.to_string(),
            file,
            connection_id: connection_id.to_string(),
        });
        Ok(())
    }
}
