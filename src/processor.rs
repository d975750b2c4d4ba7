use crate::context::ContextProvider;
use crate::record::LogRecord;
use serde_json::Value;

/// A step that enriches a [`LogRecord`] in place.
///
/// Processors run sequentially and synchronously on the emitting thread,
/// so later processors see what earlier ones added. They have no failure
/// path: missing context degrades to defaults or to an absent field.
pub trait Processor: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &'static str;

    fn process(&self, record: &mut LogRecord, ctx: &dyn ContextProvider);
}

/// Adds request details (`url`, `http_method`, `server`, `referrer`, `ua`)
/// to `extra` when the context exposes a request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestProcessor;

impl Processor for RequestProcessor {
    fn name(&self) -> &'static str {
        "request"
    }

    fn process(&self, record: &mut LogRecord, ctx: &dyn ContextProvider) {
        let Some(request) = ctx.request() else {
            return;
        };
        let fields = [
            ("url", request.url),
            ("http_method", request.http_method),
            ("server", request.server),
            ("referrer", request.referrer),
            ("ua", request.user_agent),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                record.extra.insert(key.to_string(), Value::String(value));
            }
        }
    }
}

/// Copies the record's source location into `extra`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntrospectionProcessor;

impl Processor for IntrospectionProcessor {
    fn name(&self) -> &'static str {
        "introspection"
    }

    fn process(&self, record: &mut LogRecord, _ctx: &dyn ContextProvider) {
        if let Some(file) = &record.file {
            record.extra.insert("file".to_string(), Value::String(file.clone()));
        }
        if let Some(line) = record.line {
            record.extra.insert("line".to_string(), Value::from(line));
        }
        if let Some(module) = &record.module_path {
            record.extra.insert("module".to_string(), Value::String(module.clone()));
        }
    }
}
