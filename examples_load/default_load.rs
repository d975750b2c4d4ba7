use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{error, error_span};

use tracing_log_enrich::context::StaticContext;
use tracing_log_enrich::enricher::EnricherConfig;
use tracing_log_enrich::formatter::{ElasticCloudFormatter, ElasticConfig};
use tracing_log_enrich::init::{init_tracing_with_config, LayerConfig};
use tracing_log_enrich::noop_sink::NoopSink;
use tracing_log_enrich::pipeline::Pipeline;

/// Measures the cost of enrichment, anonymization and formatting with a
/// sink that does no I/O.
#[tokio::main]
async fn main() {
    let formatter = ElasticCloudFormatter::new(ElasticConfig::with_index("load-test").expect("valid index"));
    let pipeline = Pipeline::with_enricher(
        EnricherConfig { pseudonymize: true, obfuscate: true },
        Arc::new(formatter),
    );
    let context = StaticContext::new().with_site(1, "load");

    let layer_config = LayerConfig {
        channel_buffer: 50_000,
        batch_size: 1_000,
        flush_interval: Duration::from_millis(200),
        enable_stdout: false,
        ..LayerConfig::default()
    };
    init_tracing_with_config(Arc::new(pipeline), Arc::new(NoopSink), Arc::new(context), layer_config)
        .expect("install subscriber");

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        let span = error_span!("request", user_id = i % 50, client_ip = "203.0.113.5");
        let _guard = span.enter();
        error!(iteration = i, "load test error");
    }

    let elapsed = start.elapsed();
    println!("enriched {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    // Give background task a little time to drain the channel
    sleep(Duration::from_secs(2)).await;
}
