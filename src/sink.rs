use crate::record::Document;
use async_trait::async_trait;
use std::error::Error;

/// Asynchronous destination for formatted [`Document`]s.
///
/// Implementations transport documents to a concrete backend
/// (Elasticsearch, a local file, ...). The layer calls `send` from a
/// background task and never awaits it on the application thread.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Send a single formatted document to the underlying backend.
    ///
    /// **Returns**
    /// - `Ok(())` if the document was accepted by the backend.
    /// - `Err(..)` if the backend failed (I/O, serialization, HTTP status).
    async fn send(&self, document: &Document) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Send a batch of documents.
    ///
    /// The default implementation sends them one by one and stops at the
    /// first failure. Backends with a bulk API should override it.
    async fn send_batch(&self, documents: &[Document]) -> Result<(), Box<dyn Error + Send + Sync>> {
        for document in documents {
            self.send(document).await?;
        }
        Ok(())
    }

    /// Flush any buffered documents, if the backend implements buffering.
    ///
    /// Default implementation is a no-op.
    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
