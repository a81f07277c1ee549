use crate::domain::model::OutputBlob;
use crate::domain::ports::BlobSink;
use crate::utils::error::{Result, WorkflowError};
use std::sync::Mutex;

/// Keeps delivered blobs in memory, for hosts that serve downloads themselves.
#[derive(Debug, Default)]
pub struct MemorySink {
    blobs: Mutex<Vec<OutputBlob>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blobs(&self) -> Vec<OutputBlob> {
        self.blobs
            .lock()
            .map(|blobs| blobs.clone())
            .unwrap_or_default()
    }

    pub fn take(&self) -> Vec<OutputBlob> {
        self.blobs
            .lock()
            .map(|mut blobs| std::mem::take(&mut *blobs))
            .unwrap_or_default()
    }
}

impl BlobSink for MemorySink {
    async fn deliver(&self, blob: &OutputBlob) -> Result<String> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|e| WorkflowError::SerializationError {
                message: format!("memory sink unusable, {} not kept: {}", blob.filename, e),
            })?;
        blobs.push(blob.clone());
        Ok(format!("memory://{}", blob.filename))
    }
}
