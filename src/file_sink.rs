use crate::record::Document;
use crate::sink::LogSink;
use async_trait::async_trait;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Appends one JSON line per document to a local file.
///
/// The file is created on first write if it does not exist. Writes from
/// concurrent batches are serialized by an internal lock.
pub struct FileSink {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSink {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LogSink for FileSink {
    async fn send(&self, document: &Document) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.send_batch(std::slice::from_ref(document)).await
    }

    async fn send_batch(&self, documents: &[Document]) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut lines = String::new();
        for document in documents {
            lines.push_str(&serde_json::to_string(document)?);
            lines.push('\n');
        }

        let mut guard = self.file.lock().await;
        if guard.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            *guard = Some(file);
        }
        if let Some(file) = guard.as_mut() {
            file.write_all(lines.as_bytes()).await?;
        }
        Ok(())
    }

    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        if let Some(file) = self.file.lock().await.as_mut() {
            file.flush().await?;
        }
        Ok(())
    }
}
