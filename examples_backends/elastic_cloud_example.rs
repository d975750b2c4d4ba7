use std::sync::Arc;

use tokio::time::{sleep, Duration};
use tracing::{error, info, info_span};
use tracing_log_enrich::{
    backend::{make_formatter_from_config, make_sink_from_config, parse_dsn, BackendConfig},
    context::StaticContext,
    enricher::EnricherConfig,
    init::init_tracing,
    pipeline::Pipeline,
};

#[tokio::main]
async fn main() {
    // Example DSN: elasticcloud://my-deployment.es.io:9243/app-logs
    let backend_cfg = BackendConfig::from_env().unwrap_or_else(|_| {
        parse_dsn("elasticsearch://localhost:9200/app-logs").expect("valid default DSN")
    });
    let sink = make_sink_from_config(&backend_cfg).expect("failed to build elastic sink");
    let formatter = make_formatter_from_config(&backend_cfg).expect("invalid index configuration");

    let pipeline = Pipeline::with_enricher(
        EnricherConfig { pseudonymize: true, obfuscate: true },
        formatter,
    );
    let context = StaticContext::new().with_site(1, "main");
    init_tracing(Arc::new(pipeline), sink, Arc::new(context)).expect("install subscriber");

    info!(index = %backend_cfg.index, "elastic cloud example started");

    let span = info_span!("login", user_id = 7, user_name = "bob", client_ip = "198.51.100.23");
    span.in_scope(|| error!("simulated error sent with pseudonymized user and obfuscated ip"));

    sleep(Duration::from_secs(2)).await;
}
