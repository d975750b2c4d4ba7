use std::path::PathBuf;
use std::sync::Arc;

use crate::file_sink::FileSink;
use crate::formatter::{
    ElasticCloudFormatter, ElasticConfig, ElasticsearchFormatter, FormatterError, JsonFormatter,
    SinkFormatter, DEFAULT_DOC_TYPE,
};
use crate::noop_sink::NoopSink;
use crate::sink::LogSink;

/// Supported backend kinds that can be selected via DSN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Elasticsearch,
    ElasticCloud,
    File,
    Noop,
}

/// Backend configuration parsed from a DSN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Selected backend implementation.
    pub kind: BackendKind,
    /// Raw DSN that was used to construct this config.
    pub dsn: String,
    /// `host[:port]` for Elastic backends, the file path for `file://`.
    pub target: String,
    /// Elastic index; empty for other backends.
    pub index: String,
    /// Elastic document type; `_doc` unless given in the DSN.
    pub doc_type: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl BackendConfig {
    /// Attach credentials for Elastic backends.
    pub fn with_credentials(mut self, user: impl Into<String>, password: Option<String>) -> Self {
        self.user = Some(user.into());
        self.password = password;
        self
    }

    /// Parse the DSN in `LOG_ENRICH_SINK_DSN`, with optional credentials
    /// from `LOG_ENRICH_ELASTIC_USER` / `LOG_ENRICH_ELASTIC_PASSWORD`.
    pub fn from_env() -> Result<Self, DsnError> {
        use crate::env::*;

        let dsn = env_opt(LOG_ENRICH_SINK_DSN_ENV).ok_or(DsnError::Missing)?;
        let config = parse_dsn(&dsn)?;
        Ok(match env_opt(LOG_ENRICH_ELASTIC_USER_ENV) {
            Some(user) => config.with_credentials(user, env_opt(LOG_ENRICH_ELASTIC_PASSWORD_ENV)),
            None => config,
        })
    }
}

/// Parse a DSN string and infer the backend kind from its scheme.
///
/// Examples:
/// - "elasticsearch://127.0.0.1:9200/logs"
/// - "elasticcloud://my-deployment.es.io:9243/logs/event"
/// - "elasticsearch://https://search.internal/logs"
/// - "file:///var/log/app.jsonl"
/// - "noop://"
pub fn parse_dsn(dsn: &str) -> Result<BackendConfig, DsnError> {
    let lower = dsn.to_ascii_lowercase();

    let (kind, rest) = if lower.starts_with("elasticsearch://") {
        (BackendKind::Elasticsearch, &dsn["elasticsearch://".len()..])
    } else if lower.starts_with("elasticcloud://") {
        (BackendKind::ElasticCloud, &dsn["elasticcloud://".len()..])
    } else if lower.starts_with("file://") {
        (BackendKind::File, &dsn["file://".len()..])
    } else if lower.starts_with("noop://") {
        (BackendKind::Noop, "")
    } else {
        return Err(DsnError::UnknownScheme);
    };

    let mut config = BackendConfig {
        kind,
        dsn: dsn.to_string(),
        target: String::new(),
        index: String::new(),
        doc_type: DEFAULT_DOC_TYPE.to_string(),
        user: None,
        password: None,
    };

    match kind {
        BackendKind::Elasticsearch | BackendKind::ElasticCloud => {
            // An explicit http(s) scheme may follow the backend scheme.
            let (scheme, rest) = match rest.find("://") {
                Some(pos) => (&rest[..pos + 3], &rest[pos + 3..]),
                None => ("", rest),
            };
            let mut parts = rest.split('/');
            let host = parts.next().unwrap_or("");
            if host.is_empty() {
                return Err(DsnError::MissingHost);
            }
            config.target = format!("{}{}", scheme, host);
            config.index = parts.next().filter(|s| !s.is_empty()).unwrap_or("logs").to_string();
            if let Some(doc_type) = parts.next().filter(|s| !s.is_empty()) {
                config.doc_type = doc_type.to_string();
            }
        }
        BackendKind::File => {
            if rest.is_empty() {
                return Err(DsnError::MissingPath);
            }
            config.target = rest.to_string();
        }
        BackendKind::Noop => {}
    }

    Ok(config)
}

/// Error type returned when parsing a DSN.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum DsnError {
    #[error("unknown or unsupported DSN scheme")]
    UnknownScheme,

    #[error("no sink DSN configured")]
    Missing,

    #[error("DSN has no host")]
    MissingHost,

    #[error("file DSN has no path")]
    MissingPath,
}

/// Error type returned when building a backend from configuration.
#[derive(thiserror::Error, Debug)]
pub enum BackendBuildError {
    #[error("elastic feature is not enabled")]
    ElasticFeatureDisabled,

    #[error(transparent)]
    Formatter(#[from] FormatterError),
}

/// Create a concrete `LogSink` implementation from a `BackendConfig`.
pub fn make_sink_from_config(cfg: &BackendConfig) -> Result<Arc<dyn LogSink>, BackendBuildError> {
    match cfg.kind {
        BackendKind::Elasticsearch | BackendKind::ElasticCloud => {
            #[cfg(feature = "elastic")]
            {
                use crate::elastic::{ElasticSink, ElasticSinkConfig};

                let default_scheme = if cfg.kind == BackendKind::ElasticCloud { "https" } else { "http" };
                let base_url = if cfg.target.starts_with("http://") || cfg.target.starts_with("https://") {
                    cfg.target.clone()
                } else {
                    format!("{}://{}", default_scheme, cfg.target)
                };

                let sink = ElasticSink::new(ElasticSinkConfig {
                    base_url,
                    index: cfg.index.clone(),
                    user: cfg.user.clone(),
                    password: cfg.password.clone(),
                });
                Ok(Arc::new(sink) as Arc<dyn LogSink>)
            }

            #[cfg(not(feature = "elastic"))]
            {
                let _ = cfg;
                Err(BackendBuildError::ElasticFeatureDisabled)
            }
        }
        BackendKind::File => {
            let sink = FileSink::new(PathBuf::from(&cfg.target));
            Ok(Arc::new(sink) as Arc<dyn LogSink>)
        }
        BackendKind::Noop => Ok(Arc::new(NoopSink) as Arc<dyn LogSink>),
    }
}

/// Create the formatter matching a backend: Elastic backends get their
/// index-aware formatter, everything else plain JSON documents.
pub fn make_formatter_from_config(cfg: &BackendConfig) -> Result<Arc<dyn SinkFormatter>, BackendBuildError> {
    let formatter: Arc<dyn SinkFormatter> = match cfg.kind {
        BackendKind::Elasticsearch => Arc::new(ElasticsearchFormatter::new(ElasticConfig::new(
            cfg.index.clone(),
            cfg.doc_type.clone(),
        )?)),
        BackendKind::ElasticCloud => Arc::new(ElasticCloudFormatter::new(ElasticConfig::new(
            cfg.index.clone(),
            cfg.doc_type.clone(),
        )?)),
        BackendKind::File | BackendKind::Noop => Arc::new(JsonFormatter),
    };
    Ok(formatter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_elastic_dsn() {
        let cfg = parse_dsn("elasticcloud://deploy.es.io:9243/app-logs/event").unwrap();
        assert_eq!(cfg.kind, BackendKind::ElasticCloud);
        assert_eq!(cfg.target, "deploy.es.io:9243");
        assert_eq!(cfg.index, "app-logs");
        assert_eq!(cfg.doc_type, "event");
    }

    #[test]
    fn test_parse_elastic_dsn_defaults() {
        let cfg = parse_dsn("ElasticSearch://localhost:9200").unwrap();
        assert_eq!(cfg.kind, BackendKind::Elasticsearch);
        assert_eq!(cfg.index, "logs");
        assert_eq!(cfg.doc_type, "_doc");
    }

    #[test]
    fn test_parse_elastic_dsn_with_http_scheme() {
        let cfg = parse_dsn("elasticsearch://https://search.internal/audit").unwrap();
        assert_eq!(cfg.target, "https://search.internal");
        assert_eq!(cfg.index, "audit");
    }

    #[test]
    fn test_parse_file_and_noop() {
        let cfg = parse_dsn("file:///var/log/app.jsonl").unwrap();
        assert_eq!(cfg.kind, BackendKind::File);
        assert_eq!(cfg.target, "/var/log/app.jsonl");
        assert_eq!(parse_dsn("noop://").unwrap().kind, BackendKind::Noop);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_dsn("clickhouse://x"), Err(DsnError::UnknownScheme));
        assert_eq!(parse_dsn("elasticsearch:///logs"), Err(DsnError::MissingHost));
        assert_eq!(parse_dsn("file://"), Err(DsnError::MissingPath));
    }

    #[test]
    fn test_make_formatter() {
        let cfg = parse_dsn("elasticcloud://deploy.es.io/app-logs").unwrap();
        assert_eq!(make_formatter_from_config(&cfg).unwrap().name(), "elasticcloud");

        let cfg = parse_dsn("file:///tmp/x.jsonl").unwrap();
        assert_eq!(make_formatter_from_config(&cfg).unwrap().name(), "json");

        let cfg = parse_dsn("elasticsearch://localhost/Bad-Index").unwrap();
        assert!(matches!(
            make_formatter_from_config(&cfg),
            Err(BackendBuildError::Formatter(FormatterError::InvalidIndex { .. }))
        ));
    }

    #[test]
    fn test_make_sink() {
        assert!(make_sink_from_config(&parse_dsn("noop://").unwrap()).is_ok());
        assert!(make_sink_from_config(&parse_dsn("file:///tmp/x.jsonl").unwrap()).is_ok());
    }
}
