use std::sync::Arc;

use tokio::time::{sleep, Duration};
use tracing::{error, info_span, warn};
use tracing_log_enrich::{
    backend::{make_formatter_from_config, make_sink_from_config, parse_dsn},
    context::EmptyContext,
    enricher::EnricherConfig,
    env::{env_opt, LOG_ENRICH_SINK_DSN_ENV},
    init::{init_tracing_with_config, LayerConfig},
    pipeline::Pipeline,
    processor::{IntrospectionProcessor, RequestProcessor},
};

#[tokio::main]
async fn main() {
    let dsn = env_opt(LOG_ENRICH_SINK_DSN_ENV)
        .unwrap_or_else(|| "file:///tmp/tracing-log-enrich.jsonl".to_string());

    let backend_cfg = parse_dsn(&dsn).expect("invalid LOG_ENRICH_SINK_DSN");
    let sink = make_sink_from_config(&backend_cfg).expect("failed to build sink");
    let formatter = make_formatter_from_config(&backend_cfg).expect("failed to build formatter");

    let pipeline = Pipeline::with_enricher(EnricherConfig::from_env(), formatter)
        .add_processor(RequestProcessor)
        .add_processor(IntrospectionProcessor);

    let config = LayerConfig {
        min_level: tracing::Level::WARN,
        ..LayerConfig::default()
    };
    init_tracing_with_config(Arc::new(pipeline), sink, Arc::new(EmptyContext), config)
        .expect("install subscriber");

    let span = info_span!(
        "request",
        site_id = 2,
        site_name = "shop",
        user_id = 42,
        user_name = "alice",
        client_ip = "203.0.113.5",
        http_method = "POST",
        url = "/checkout"
    );
    span.in_scope(|| {
        warn!(cart = 17, "payment provider slow");
        error!(cart = 17, "payment provider unreachable");
    });

    sleep(Duration::from_secs(2)).await;
    println!("wrote enriched records to {}", backend_cfg.target);
}
