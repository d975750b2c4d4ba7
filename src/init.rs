use crate::context::ContextProvider;
use crate::layer::PipelineLayer;
use crate::pipeline::Pipeline;
use crate::sink::LogSink;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::subscriber::SetGlobalDefaultError;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration of the logging layer.
///
/// **Fields**
/// - `min_level`: least severe level that is captured (`ERROR` captures
///   only errors, `WARN` warnings and errors, ...).
/// - `channel_buffer`: maximum number of documents queued before new ones
///   are dropped.
/// - `batch_size`: number of documents handed to the sink at once.
/// - `flush_interval`: longest wait before a partial batch is delivered.
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt` layer is
///   stacked on top so events are also printed to the console.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub min_level: Level,
    pub channel_buffer: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub enable_stdout: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            min_level: Level::ERROR,
            channel_buffer: 1024,
            batch_size: 128,
            flush_interval: Duration::from_secs(1),
            enable_stdout: true,
        }
    }
}

/// Install a global `tracing` subscriber that runs every captured event
/// through `pipeline` and delivers the result to `sink`.
///
/// `context` supplies site/user/address values that no enclosing span
/// carries. Must be called from within a Tokio runtime.
///
/// **Errors**
///
/// Fails if a global default subscriber was already installed.
pub fn init_tracing_with_config(
    pipeline: Arc<Pipeline>,
    sink: Arc<dyn LogSink>,
    context: Arc<dyn ContextProvider>,
    config: LayerConfig,
) -> Result<(), SetGlobalDefaultError> {
    let (layer, _handle) = PipelineLayer::new(pipeline, sink, &config);
    let layer = layer.with_context(context);

    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)
    }
}

/// Initialize tracing with [`LayerConfig::default`] and the given context
/// provider.
pub fn init_tracing(
    pipeline: Arc<Pipeline>,
    sink: Arc<dyn LogSink>,
    context: Arc<dyn ContextProvider>,
) -> Result<(), SetGlobalDefaultError> {
    init_tracing_with_config(pipeline, sink, context, LayerConfig::default())
}
