use crate::record::{Document, LogRecord};
use chrono::{SecondsFormat, Utc};
use serde_json::Value;

/// Document type used when none is configured.
pub const DEFAULT_DOC_TYPE: &str = "_doc";

/// Renders a [`LogRecord`] into the wire shape of one kind of sink.
///
/// Formatting is a pure transform and always succeeds; anything that could
/// make it fail (index names, document types) is validated when the
/// formatter is built.
pub trait SinkFormatter: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &'static str;

    fn format(&self, record: &LogRecord) -> Document;

    fn format_batch(&self, records: &[LogRecord]) -> Vec<Document> {
        records.iter().map(|record| self.format(record)).collect()
    }
}

/// Error returned when a formatter is built from an invalid configuration.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum FormatterError {
    #[error("invalid index name {name:?}: {reason}")]
    InvalidIndex { name: String, reason: &'static str },

    #[error("document type must not be empty")]
    InvalidType,
}

/// Target index and document type of an Elastic-family formatter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElasticConfig {
    index: String,
    doc_type: String,
}

impl ElasticConfig {
    /// Validate and build a configuration.
    ///
    /// Index names follow Elasticsearch's rules: lowercase, at most 255
    /// bytes, no leading `-`, `_` or `+`, not `.` or `..`, and none of
    /// `\ / * ? " < > | , #` or spaces.
    pub fn new(index: impl Into<String>, doc_type: impl Into<String>) -> Result<Self, FormatterError> {
        let index = index.into();
        let doc_type = doc_type.into();
        validate_index(&index)?;
        if doc_type.trim().is_empty() {
            return Err(FormatterError::InvalidType);
        }
        Ok(ElasticConfig { index, doc_type })
    }

    /// Same as [`ElasticConfig::new`] with the `_doc` type.
    pub fn with_index(index: impl Into<String>) -> Result<Self, FormatterError> {
        Self::new(index, DEFAULT_DOC_TYPE)
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn doc_type(&self) -> &str {
        &self.doc_type
    }
}

fn validate_index(name: &str) -> Result<(), FormatterError> {
    let invalid = |reason| FormatterError::InvalidIndex { name: name.to_string(), reason };

    if name.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if name.len() > 255 {
        return Err(invalid("longer than 255 bytes"));
    }
    if name == "." || name == ".." {
        return Err(invalid("must not be `.` or `..`"));
    }
    if name.starts_with(['-', '_', '+']) {
        return Err(invalid("must not start with `-`, `_` or `+`"));
    }
    if name.chars().any(|c| c.is_uppercase()) {
        return Err(invalid("must be lowercase"));
    }
    if name
        .chars()
        .any(|c| matches!(c, '\\' | '/' | '*' | '?' | '"' | '<' | '>' | '|' | ' ' | ',' | '#'))
    {
        return Err(invalid("contains a forbidden character"));
    }
    Ok(())
}

/// Plain document, used for JSON-lines files.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl SinkFormatter for JsonFormatter {
    fn name(&self) -> &'static str {
        "json"
    }

    fn format(&self, record: &LogRecord) -> Document {
        record.to_document()
    }
}

/// Generic search-index formatter: the record's document plus `_index` and
/// `_type`. The record's own timestamp is kept.
#[derive(Debug, Clone)]
pub struct ElasticsearchFormatter {
    config: ElasticConfig,
}

impl ElasticsearchFormatter {
    pub fn new(config: ElasticConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ElasticConfig {
        &self.config
    }

    fn add_target(&self, doc: &mut Document) {
        doc.insert("_index".to_string(), Value::String(self.config.index.clone()));
        doc.insert("_type".to_string(), Value::String(self.config.doc_type.clone()));
    }
}

impl SinkFormatter for ElasticsearchFormatter {
    fn name(&self) -> &'static str {
        "elasticsearch"
    }

    fn format(&self, record: &LogRecord) -> Document {
        let mut doc = record.to_document();
        self.add_target(&mut doc);
        doc
    }
}

/// Elastic Cloud variant: like [`ElasticsearchFormatter`] but `@timestamp`
/// is set to the wall-clock time at format time, replacing any value the
/// record already carried.
#[derive(Debug, Clone)]
pub struct ElasticCloudFormatter {
    inner: ElasticsearchFormatter,
}

impl ElasticCloudFormatter {
    pub fn new(config: ElasticConfig) -> Self {
        Self { inner: ElasticsearchFormatter::new(config) }
    }

    pub fn config(&self) -> &ElasticConfig {
        self.inner.config()
    }
}

impl SinkFormatter for ElasticCloudFormatter {
    fn name(&self) -> &'static str {
        "elasticcloud"
    }

    fn format(&self, record: &LogRecord) -> Document {
        let mut doc = record.to_document();
        doc.insert(
            "@timestamp".to_string(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, false)),
        );
        self.inner.add_target(&mut doc);
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration};
    use serde_json::json;

    fn config() -> ElasticConfig {
        ElasticConfig::new("logs-2024", "_doc").unwrap()
    }

    #[test]
    fn test_elastic_cloud_sets_target_and_timestamp() {
        let before = Utc::now() - Duration::seconds(1);
        let doc = ElasticCloudFormatter::new(config()).format(&LogRecord::new("INFO", "app"));
        let after = Utc::now();

        assert_eq!(doc["_index"], json!("logs-2024"));
        assert_eq!(doc["_type"], json!("_doc"));
        let stamp = doc["@timestamp"].as_str().unwrap();
        assert!(stamp.ends_with("+00:00"));
        let parsed = DateTime::parse_from_rfc3339(stamp).unwrap();
        let parsed = parsed.with_timezone(&Utc);
        assert!(parsed >= before && parsed <= after);
    }

    #[test]
    fn test_elastic_cloud_ignores_record_timestamp() {
        let mut record = LogRecord::new("INFO", "app");
        record.timestamp = Utc::now() - Duration::days(3);
        let doc = ElasticCloudFormatter::new(config()).format(&record);

        let stamp = DateTime::parse_from_rfc3339(doc["@timestamp"].as_str().unwrap()).unwrap();
        assert!(stamp.with_timezone(&Utc) > record.timestamp + Duration::days(2));
    }

    #[test]
    fn test_elastic_cloud_overwrites_host_timestamp_and_target() {
        let record = LogRecord::from_value(json!({
            "@timestamp": "2001-01-01T00:00:00+00:00",
            "_index": "stale",
            "datetime": "2001-01-01"
        }))
        .unwrap();
        let doc = ElasticCloudFormatter::new(config()).format(&record);

        assert_ne!(doc["@timestamp"], json!("2001-01-01T00:00:00+00:00"));
        assert_eq!(doc["_index"], json!("logs-2024"));
        assert_eq!(doc["datetime"], json!("2001-01-01"));
    }

    #[test]
    fn test_elastic_cloud_target_is_stable() {
        let formatter = ElasticCloudFormatter::new(config());
        let record = LogRecord::new("ERROR", "app");
        let first = formatter.format(&record);
        let second = formatter.format(&record);
        assert_eq!(first["_index"], second["_index"]);
        assert_eq!(first["_type"], second["_type"]);
    }

    #[test]
    fn test_elasticsearch_keeps_record_timestamp() {
        let record = LogRecord::new("INFO", "app");
        let doc = ElasticsearchFormatter::new(config()).format(&record);
        assert_eq!(doc["timestamp"], serde_json::to_value(record.timestamp).unwrap());
        assert!(!doc.contains_key("@timestamp"));
        assert_eq!(doc["_index"], json!("logs-2024"));
    }

    #[test]
    fn test_json_formatter_has_no_target() {
        let doc = JsonFormatter.format(&LogRecord::new("INFO", "app").with_extra("siteid", 1));
        assert!(!doc.contains_key("_index"));
        assert_eq!(doc["extra"]["siteid"], json!(1));
    }

    #[test]
    fn test_format_batch() {
        let records = vec![LogRecord::new("INFO", "a"), LogRecord::new("WARN", "b")];
        let docs = ElasticsearchFormatter::new(config()).format_batch(&records);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1]["channel"], json!("b"));
    }

    #[test]
    fn test_index_validation() {
        assert!(ElasticConfig::with_index("app-logs.2024").is_ok());
        for bad in ["", "Logs", "_hidden", "-x", "+x", ".", "..", "a b", "a/b", "a#b", "a,b"] {
            assert!(
                matches!(ElasticConfig::with_index(bad), Err(FormatterError::InvalidIndex { .. })),
                "{bad:?} should be rejected"
            );
        }
        assert!(ElasticConfig::with_index("x".repeat(256)).is_err());
        assert_eq!(ElasticConfig::new("logs", " "), Err(FormatterError::InvalidType));
    }
}
