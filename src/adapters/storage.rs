use crate::domain::model::OutputBlob;
use crate::domain::ports::{BlobSink, Storage};
use crate::utils::error::Result;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::fs;

/// Writes files below a base directory; doubles as the download sink for CLI runs.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    fn full_path(&self, path: &str) -> PathBuf {
        Path::new(&self.base_path).join(path)
    }
}

impl Storage for LocalStorage {
    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(full_path, data).await?;
        Ok(())
    }
}

impl BlobSink for LocalStorage {
    async fn deliver(&self, blob: &OutputBlob) -> Result<String> {
        let filename = sanitize_filename(&blob.filename);
        self.write_file(&filename, &blob.bytes).await?;

        let location = self.full_path(&filename).display().to_string();
        tracing::info!("{}: {} ({} bytes)", blob.label, location, blob.bytes.len());
        Ok(location)
    }
}

fn unsafe_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // path separators and characters Windows rejects in file names
    PATTERN.get_or_init(|| Regex::new(r#"[/\\:*?"<>|\x00-\x1F]"#).expect("valid regex"))
}

/// Office names come from cell text; keep them from escaping the output directory.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned = unsafe_chars().replace_all(name, "_");
    let trimmed = cleaned.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}
