use crate::context::ContextProvider;
use crate::enricher::{ContextEnricher, EnricherConfig};
use crate::formatter::{JsonFormatter, SinkFormatter};
use crate::processor::Processor;
use crate::record::{Document, LogRecord};
use std::sync::Arc;
use tracing::debug;

/// Processors followed by exactly one formatter.
///
/// Running a record through the pipeline is synchronous and cannot fail.
pub struct Pipeline {
    processors: Vec<Arc<dyn Processor>>,
    formatter: Arc<dyn SinkFormatter>,
}

impl Pipeline {
    /// Create a pipeline without processors that renders with `formatter`.
    pub fn new(formatter: Arc<dyn SinkFormatter>) -> Self {
        debug!(formatter = formatter.name(), "pipeline created");
        Self {
            processors: Vec::new(),
            formatter,
        }
    }

    /// A pipeline with a [`ContextEnricher`] built from `config`.
    pub fn with_enricher(config: EnricherConfig, formatter: Arc<dyn SinkFormatter>) -> Self {
        Self::new(formatter).add_processor(ContextEnricher::new(config))
    }

    /// Append a processor; processors run in insertion order.
    pub fn add_processor<P: Processor + 'static>(mut self, processor: P) -> Self {
        debug!(processor = processor.name(), "adding processor to pipeline");
        self.processors.push(Arc::new(processor));
        self
    }

    /// Apply every processor to `record` in place.
    pub fn process(&self, record: &mut LogRecord, ctx: &dyn ContextProvider) {
        for processor in &self.processors {
            processor.process(record, ctx);
        }
    }

    /// Process `record` and render it.
    pub fn run(&self, mut record: LogRecord, ctx: &dyn ContextProvider) -> Document {
        self.process(&mut record, ctx);
        self.formatter.format(&record)
    }

    pub fn processor_names(&self) -> Vec<&'static str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    pub fn formatter_name(&self) -> &'static str {
        self.formatter.name()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(Arc::new(JsonFormatter))
    }
}
