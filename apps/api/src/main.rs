mod clock;
mod config;
mod credentials;
mod db;
mod errors;
mod explain;
mod extraction;
mod llm_client;
mod models;
mod pipeline;
mod routes;
mod scoring;
mod state;
mod storage;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::clock::SystemClock;
use crate::config::Config;
use crate::db::create_pool;
use crate::explain::ExplanationAdapter;
use crate::extraction::{ExtractionChain, ParserApiClient};
use crate::llm_client::LlmClient;
use crate::pipeline::queue::run_worker;
use crate::pipeline::stages::{build_handlers, StageDeps};
use crate::pipeline::{Orchestrator, Queue};
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{build_s3_client, DocumentStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting pipeline API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (runs migrations)
    let db = create_pool(&config.database_url).await?;

    // Initialize Redis
    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    // Initialize S3 / MinIO document store
    let s3 = build_s3_client(&config).await?;
    let storage = DocumentStore::new(s3, config.s3_bucket.clone());
    info!("S3 client initialized");

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Optional external structured-parsing service
    let parser = config
        .parser_api_url
        .clone()
        .map(|url| ParserApiClient::new(url, config.parser_api_key.clone()));
    if parser.is_some() {
        info!("External parser service configured");
    }
    let chain = ExtractionChain::new(parser);

    let clock = Arc::new(SystemClock) as Arc<dyn clock::Clock>;
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    let queue = Queue::new(db.clone(), clock.clone());
    let adapter = Arc::new(ExplanationAdapter::new(db.clone(), redis, llm, clock.clone()));

    // Register stage handlers and start the worker pool
    let handlers = Arc::new(build_handlers(StageDeps {
        pool: db.clone(),
        storage,
        chain,
        adapter,
        queue: queue.clone(),
        clock: clock.clone(),
        http,
        explanations_enabled: config.explanations_enabled,
        explain_delay: Duration::from_secs(config.explain_delay_secs),
    }));
    for worker_id in 0..config.worker_count {
        tokio::spawn(run_worker(db.clone(), handlers.clone(), worker_id));
    }
    info!("Started {} pipeline workers", config.worker_count);

    // Build app state and router
    let state = AppState {
        db,
        orchestrator: Orchestrator::new(queue),
        clock,
    };
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
