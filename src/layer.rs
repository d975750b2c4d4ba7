use crate::context::{ContextProvider, EmptyContext, RequestInfo};
use crate::init::LayerConfig;
use crate::pipeline::Pipeline;
use crate::record::{Document, LogRecord};
use crate::sink::LogSink;
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, atomic::{AtomicU64, Ordering}};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that turns events into enriched, formatted
/// documents and forwards them to an asynchronous [`LogSink`] via a
/// bounded channel and background task.
///
/// Only events at `min_level` or more severe are captured. Enrichment and
/// formatting run inline on the emitting thread; network and file I/O are
/// decoupled from it entirely.
///
/// The execution context of an event is read from the fields of its
/// enclosing spans (`site_id`, `site_name`, `user_id`, `user_name`,
/// `client_ip`, `url`, `http_method`, `server`, `referrer`, `user_agent`),
/// innermost span first, falling back to the provider set with
/// [`PipelineLayer::with_context`].
pub struct PipelineLayer {
    sender: mpsc::Sender<Document>,
    pipeline: Arc<Pipeline>,
    fallback: Arc<dyn ContextProvider>,
    min_level: Level,
    /// Total events seen by the layer (before filtering by level).
    pub total_events: Arc<AtomicU64>,
    /// Successfully enqueued into channel.
    pub enqueued_events: Arc<AtomicU64>,
    /// Dropped because the channel was full or closed.
    pub dropped_events: Arc<AtomicU64>,
}

impl PipelineLayer {
    /// Create a new layer and spawn a background task that pulls
    /// documents from a bounded channel and sends them to `sink` in
    /// batches.
    ///
    /// Must be called from within a Tokio runtime. Minimal thresholds are
    /// enforced for the buffer, batch size and flush interval to avoid
    /// degenerate configurations.
    pub fn new(
        pipeline: Arc<Pipeline>,
        sink: Arc<dyn LogSink>,
        config: &LayerConfig,
    ) -> (Self, JoinHandle<()>) {
        let buffer = config.channel_buffer.max(16);
        let batch_size = config.batch_size.max(1);
        let flush_interval = config.flush_interval.max(Duration::from_millis(10));

        let (tx, mut rx) = mpsc::channel::<Document>(buffer);

        let total_events = Arc::new(AtomicU64::new(0));
        let enqueued_events = Arc::new(AtomicU64::new(0));
        let dropped_events = Arc::new(AtomicU64::new(0));

        let handle = tokio::spawn(async move {
            let mut batch = Vec::with_capacity(batch_size);

            loop {
                tokio::select! {
                    received = rx.recv() => match received {
                        Some(document) => {
                            batch.push(document);
                            if batch.len() >= batch_size {
                                deliver(&*sink, &mut batch).await;
                            }
                        }
                        None => {
                            deliver(&*sink, &mut batch).await;
                            if let Err(e) = sink.flush().await {
                                eprintln!("error flushing log sink: {}", e);
                            }
                            break;
                        }
                    },
                    _ = sleep(flush_interval) => {
                        deliver(&*sink, &mut batch).await;
                    }
                }
            }
        });

        (Self {
            sender: tx,
            pipeline,
            fallback: Arc::new(EmptyContext),
            min_level: config.min_level,
            total_events,
            enqueued_events,
            dropped_events,
        }, handle)
    }

    /// Provider consulted for values no enclosing span carries.
    pub fn with_context(mut self, provider: Arc<dyn ContextProvider>) -> Self {
        self.fallback = provider;
        self
    }
}

/// Single delivery attempt; a failed batch is reported and dropped.
async fn deliver(sink: &dyn LogSink, batch: &mut Vec<Document>) {
    if batch.is_empty() {
        return;
    }
    // Reporting through `tracing` here would feed the failure back into
    // this layer.
    if let Err(e) = sink.send_batch(batch).await {
        eprintln!("error sending log batch of {} documents: {}", batch.len(), e);
    }
    batch.clear();
}

/// Fields recorded on a span, stored in its extensions.
#[derive(Debug, Default)]
struct SpanFields(BTreeMap<String, Value>);

impl<S> Layer<S> for PipelineLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut fields = BTreeMap::new();
        let mut message = None;
        attrs.record(&mut FieldVisitor { fields: &mut fields, message: &mut message });
        // Another `PipelineLayer` on the same registry may have stored them
        // already; `insert` panics on a duplicate type.
        let mut extensions = span.extensions_mut();
        match extensions.get_mut::<SpanFields>() {
            Some(SpanFields(existing)) => existing.extend(fields),
            None => extensions.insert(SpanFields(fields)),
        }
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        if let Some(SpanFields(fields)) = extensions.get_mut::<SpanFields>() {
            let mut message = None;
            values.record(&mut FieldVisitor { fields, message: &mut message });
        }
    }

    fn on_event(&self, event: &Event, ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        if *event.metadata().level() > self.min_level {
            return;
        }

        let mut fields = BTreeMap::new();
        let mut message: Option<String> = None;

        let mut visitor = FieldVisitor { fields: &mut fields, message: &mut message };
        event.record(&mut visitor);

        // Root first, so inner spans overwrite outer ones.
        let mut scope_fields = BTreeMap::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                if let Some(SpanFields(span_fields)) = span.extensions().get::<SpanFields>() {
                    scope_fields.extend(span_fields.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
            }
        }
        let context = SpanContext { fields: &scope_fields, fallback: &*self.fallback };

        let meta = event.metadata();
        let record = LogRecord {
            timestamp: Utc::now(),
            level: meta.level().to_string(),
            channel: meta.target().to_string(),
            module_path: meta.module_path().map(|s| s.to_string()),
            file: meta.file().map(|s| s.to_string()),
            line: meta.line(),
            context: fields,
            message,
            extra: BTreeMap::new(),
            rest: BTreeMap::new(),
        };

        let document = self.pipeline.run(record, &context);
        match self.sender.try_send(document) {
            Ok(()) => {
                self.enqueued_events.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(_)) => {
                self.dropped_events.fetch_add(1, Ordering::Relaxed);
                eprintln!("log channel full, dropping log document");
            }
            Err(TrySendError::Closed(_)) => {
                self.dropped_events.fetch_add(1, Ordering::Relaxed);
                eprintln!("log channel closed, dropping log document");
            }
        }
    }
}

/// Execution context assembled from span fields, layered over a fallback
/// provider.
pub struct SpanContext<'a> {
    fields: &'a BTreeMap<String, Value>,
    fallback: &'a dyn ContextProvider,
}

impl<'a> SpanContext<'a> {
    pub fn new(fields: &'a BTreeMap<String, Value>, fallback: &'a dyn ContextProvider) -> Self {
        SpanContext { fields, fallback }
    }

    fn string(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// A key that is present but not a non-negative integer reads as `0`,
    /// so a bad span value never borrows the fallback's identity.
    fn number(&self, key: &str) -> Option<u64> {
        let parsed = match self.fields.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            Value::Null => return None,
            _ => None,
        };
        Some(parsed.unwrap_or(0))
    }
}

impl ContextProvider for SpanContext<'_> {
    fn site_id(&self) -> Option<u64> {
        self.number("site_id").or_else(|| self.fallback.site_id())
    }

    fn site_name(&self) -> Option<String> {
        self.string("site_name").or_else(|| self.fallback.site_name())
    }

    fn user_id(&self) -> Option<u64> {
        self.number("user_id").or_else(|| self.fallback.user_id())
    }

    fn user_name(&self) -> Option<String> {
        self.string("user_name").or_else(|| self.fallback.user_name())
    }

    fn remote_addr(&self) -> Option<String> {
        self.string("client_ip").or_else(|| self.fallback.remote_addr())
    }

    fn request(&self) -> Option<RequestInfo> {
        let from_spans = RequestInfo {
            url: self.string("url"),
            http_method: self.string("http_method"),
            server: self.string("server"),
            referrer: self.string("referrer"),
            user_agent: self.string("user_agent"),
        };
        if from_spans.is_empty() {
            self.fallback.request()
        } else {
            Some(from_spans)
        }
    }
}

use tracing::field::{Field, Visit};

pub struct FieldVisitor<'a> {
    pub fields: &'a mut BTreeMap<String, Value>,
    pub message: &'a mut Option<String>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(field.name().to_string(), Value::String(format!("{:?}", value)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StaticContext;
    use serde_json::json;

    #[test]
    fn test_span_context_prefers_span_fields() {
        let fields: BTreeMap<String, Value> = [
            ("user_id".to_string(), json!(42)),
            ("site_id".to_string(), json!("7")),
            ("client_ip".to_string(), json!("203.0.113.5")),
        ]
        .into_iter()
        .collect();
        let fallback = StaticContext::new().with_site(1, "Main").with_user(5, "bob");
        let ctx = SpanContext::new(&fields, &fallback);

        assert_eq!(ctx.user_id(), Some(42));
        assert_eq!(ctx.user_name(), Some("bob".to_string()));
        assert_eq!(ctx.site_id(), Some(7));
        assert_eq!(ctx.site_name(), Some("Main".to_string()));
        assert_eq!(ctx.remote_addr(), Some("203.0.113.5".to_string()));
        assert_eq!(ctx.request(), None);
    }

    #[test]
    fn test_span_context_request_from_fields() {
        let fields: BTreeMap<String, Value> =
            [("http_method".to_string(), json!("GET"))].into_iter().collect();
        let ctx = SpanContext::new(&fields, &EmptyContext);
        let request = ctx.request().unwrap();
        assert_eq!(request.http_method.as_deref(), Some("GET"));
        assert_eq!(request.url, None);
    }

    #[test]
    fn test_span_context_unparseable_ids_read_as_zero() {
        let fallback = StaticContext::new().with_site(1, "Main").with_user(5, "bob");
        for bad in [json!(-1), json!("abc"), json!(1.5), json!(true)] {
            let fields: BTreeMap<String, Value> = [
                ("user_id".to_string(), bad.clone()),
                ("site_id".to_string(), bad.clone()),
            ]
            .into_iter()
            .collect();
            let ctx = SpanContext::new(&fields, &fallback);
            assert_eq!(ctx.user_id(), Some(0), "{bad}");
            assert_eq!(ctx.site_id(), Some(0), "{bad}");
        }
    }
}
