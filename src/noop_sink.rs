use crate::record::Document;
use crate::sink::LogSink;
use async_trait::async_trait;
use std::error::Error;

/// A sink that simply drops all documents.
///
/// Useful for measuring the cost of enrichment and formatting without any
/// external I/O.
#[derive(Clone, Default)]
pub struct NoopSink;

#[async_trait]
impl LogSink for NoopSink {
    async fn send(&self, _document: &Document) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
