use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Flat mapping produced by a [`SinkFormatter`](crate::formatter::SinkFormatter)
/// and consumed by a [`LogSink`](crate::sink::LogSink).
pub type Document = Map<String, Value>;

/// A single structured log event travelling through the pipeline.
///
/// The core fields (`timestamp`, `level`, `channel`, `message` and the
/// source location) belong to the emitter and are passed through untouched.
/// `context` carries the event's own fields, `extra` the metadata added by
/// processors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default)]
    pub context: BTreeMap<String, Value>,
    #[serde(default)]
    pub extra: BTreeMap<String, Value>,
    /// Top-level keys of a host mapping that have no field above, e.g.
    /// Monolog's `datetime` or `level_name`. Emitted unchanged.
    #[serde(flatten)]
    pub rest: BTreeMap<String, Value>,
}

fn default_level() -> String {
    "INFO".to_string()
}

fn default_channel() -> String {
    "app".to_string()
}

/// Error returned when a host-supplied mapping cannot be turned into a
/// [`LogRecord`].
#[derive(thiserror::Error, Debug)]
pub enum RecordError {
    #[error("malformed record: {0}")]
    Malformed(String),
}

impl LogRecord {
    /// Create a record stamped with the current time and empty maps.
    pub fn new(level: impl Into<String>, channel: impl Into<String>) -> Self {
        LogRecord {
            timestamp: Utc::now(),
            level: level.into(),
            channel: channel.into(),
            message: None,
            module_path: None,
            file: None,
            line: None,
            context: BTreeMap::new(),
            extra: BTreeMap::new(),
            rest: BTreeMap::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Build a record from a loose JSON mapping.
    ///
    /// Missing `extra`/`context` maps are initialised empty, missing core
    /// fields get their defaults and unknown keys land in `rest`. Anything that is not an object at the top
    /// level, or whose `extra`/`context` is not an object, is rejected
    /// rather than producing a corrupt sink payload.
    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        let obj = match value {
            Value::Object(obj) => obj,
            other => {
                return Err(RecordError::Malformed(format!(
                    "expected a mapping, got {}",
                    kind_of(&other)
                )))
            }
        };
        for key in ["extra", "context"] {
            match obj.get(key) {
                None | Some(Value::Object(_)) => {}
                Some(other) => {
                    return Err(RecordError::Malformed(format!(
                        "`{}` must be a mapping, got {}",
                        key,
                        kind_of(other)
                    )))
                }
            }
        }
        serde_json::from_value(Value::Object(obj)).map_err(|e| RecordError::Malformed(e.to_string()))
    }

    /// Serialize the record into a flat [`Document`].
    pub fn to_document(&self) -> Document {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            // A struct with string keys always serializes to an object.
            _ => Document::new(),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a mapping",
    }
}
