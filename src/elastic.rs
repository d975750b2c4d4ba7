use crate::record::Document;
use crate::sink::LogSink;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::error::Error;

/// Configuration for [`ElasticSink`].
#[derive(Clone, Debug)]
pub struct ElasticSinkConfig {
    /// Base URL of the cluster, e.g. "http://localhost:9200".
    pub base_url: String,
    /// Index used for documents that carry no `_index` of their own.
    pub index: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Elasticsearch / Elastic Cloud sink posting documents to the `_bulk` API.
#[derive(Clone)]
pub struct ElasticSink {
    client: Client,
    config: ElasticSinkConfig,
}

impl ElasticSink {
    pub fn new(config: ElasticSinkConfig) -> Self {
        ElasticSink {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/_bulk", self.config.base_url.trim_end_matches('/'))
    }
}

/// Build an NDJSON bulk body for `documents`.
///
/// `_index` and `_type` are metadata, not source: they move from each
/// document into its action line. `_type` is only emitted when it is not
/// the typeless `_doc`, which recent clusters reject in action lines.
pub fn bulk_body(documents: &[Document], default_index: &str) -> Result<String, serde_json::Error> {
    let mut body = String::new();
    for document in documents {
        let mut source = document.clone();
        let index = match source.remove("_index") {
            Some(Value::String(index)) => index,
            _ => default_index.to_string(),
        };
        let mut meta = json!({ "_index": index });
        if let Some(Value::String(doc_type)) = source.remove("_type") {
            if doc_type != crate::formatter::DEFAULT_DOC_TYPE {
                meta["_type"] = Value::String(doc_type);
            }
        }
        body.push_str(&serde_json::to_string(&json!({ "index": meta }))?);
        body.push('\n');
        body.push_str(&serde_json::to_string(&source)?);
        body.push('\n');
    }
    Ok(body)
}

#[async_trait]
impl LogSink for ElasticSink {
    async fn send(&self, document: &Document) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.send_batch(std::slice::from_ref(document)).await
    }

    async fn send_batch(&self, documents: &[Document]) -> Result<(), Box<dyn Error + Send + Sync>> {
        if documents.is_empty() {
            return Ok(());
        }
        let body = bulk_body(documents, &self.config.index)?;

        let mut request = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/x-ndjson")
            .body(body);
        if let Some(user) = &self.config.user {
            request = request.basic_auth(user, self.config.password.as_ref());
        }
        let resp = request.send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            return Err(format!("Elasticsearch bulk insert failed with status {}: {}", status, text).into());
        }

        // A 200 response can still report per-item failures.
        let summary: Value = resp.json().await?;
        if summary.get("errors").and_then(Value::as_bool) == Some(true) {
            return Err("Elasticsearch bulk insert reported item errors".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_bulk_body_moves_metadata_to_action_line() {
        let docs = vec![doc(json!({
            "_index": "logs-2024",
            "_type": "event",
            "message": "boom"
        }))];
        let body = bulk_body(&docs, "fallback").unwrap();
        let lines: Vec<Value> = body
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], json!({ "index": { "_index": "logs-2024", "_type": "event" } }));
        assert_eq!(lines[1], json!({ "message": "boom" }));
        assert!(body.ends_with('\n'));
    }

    #[test]
    fn test_bulk_body_defaults() {
        let docs = vec![
            doc(json!({ "message": "a" })),
            doc(json!({ "_index": "other", "_type": "_doc", "message": "b" })),
        ];
        let body = bulk_body(&docs, "fallback").unwrap();
        let lines: Vec<Value> = body
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], json!({ "index": { "_index": "fallback" } }));
        assert_eq!(lines[2], json!({ "index": { "_index": "other" } }));
        assert_eq!(lines[3], json!({ "message": "b" }));
    }

    #[test]
    fn test_endpoint_trims_slash() {
        let sink = ElasticSink::new(ElasticSinkConfig {
            base_url: "http://localhost:9200/".to_string(),
            index: "logs".to_string(),
            user: None,
            password: None,
        });
        assert_eq!(sink.endpoint(), "http://localhost:9200/_bulk");
    }
}
