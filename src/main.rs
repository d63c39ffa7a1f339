use clauselens::{config::Config, extract, logging, pipeline, queue, store};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    logging::init_tracing();

    let config = Arc::new(Config::from_env().expect("Failed to load configuration"));
    let store: Arc<dyn store::Store> = Arc::new(store::InMemoryStore::new());
    let extractor: Arc<dyn extract::TextExtractor> = Arc::new(extract::PlainTextExtractor::new());

    let service = Arc::new(pipeline::AnalysisService::new(
        config.clone(),
        store.clone(),
        extractor,
    ));
    let handler = Arc::new(pipeline::AnalysisHandler::new(service));
    let job_queue = queue::JobQueue::start(handler, config.worker_count, config.queue_capacity);

    let retention = Duration::from_secs(config.job_retention_days.max(0) as u64 * 86_400);
    let sweep_interval = Duration::from_secs(config.sweep_interval_secs);
    let sweeper = queue::spawn_job_sweeper(store, retention, sweep_interval);

    tracing::info!(workers = config.worker_count, "clauselens worker running");
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");
    tracing::info!("Shutdown signal received; draining queue");

    sweeper.abort();
    job_queue.shutdown().await;
}
