//! Recall HTTP server entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use recall::backend::LlmBackend;
use recall::breaker::{BreakerConfig, CircuitBreaker};
use recall::config::Config;
use recall::embedding::{EmbedderConfig, TextEmbedder};
use recall::gateway::{AppState, create_router};
use recall::metrics::MetricsRegistry;
use recall::pipeline::QueryPipeline;
use recall::store::{QdrantIndex, SemanticStore, StoreConfig, spawn_sweeper};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const STORE_BREAKER: BreakerConfig = BreakerConfig {
    failure_threshold: 3,
    recovery_timeout: Duration::from_secs(10),
    half_open_max_calls: 1,
};

const BACKEND_BREAKER: BreakerConfig = BreakerConfig {
    failure_threshold: 3,
    recovery_timeout: Duration::from_secs(30),
    half_open_max_calls: 1,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(run_health_check());
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    config.validate()?;
    let addr: SocketAddr = config.socket_addr().parse()?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        llm_model = %config.llm_model,
        "Recall starting"
    );

    // Process-wide singletons: constructed once, injected everywhere.
    let metrics = Arc::new(MetricsRegistry::new());
    let store_breaker = Arc::new(CircuitBreaker::new("qdrant", STORE_BREAKER));
    let backend_breaker = Arc::new(CircuitBreaker::new("llm", BACKEND_BREAKER));

    let embedder_config = if let Some(path) = &config.model_path {
        EmbedderConfig::new(path.clone())
    } else {
        tracing::warn!("No RECALL_MODEL_PATH configured, running embedder in stub mode");
        EmbedderConfig::stub()
    };
    let embedder = Arc::new(TextEmbedder::load(embedder_config)?);

    let index = QdrantIndex::connect(&config.qdrant_url).await?;
    index.health_check().await?;
    tracing::info!(qdrant_url = %config.qdrant_url, "Connected to Qdrant");

    let store_config = StoreConfig {
        collection_name: config.collection_name.clone(),
        vector_size: embedder.embedding_dim() as u64,
        max_entries: config.max_entries,
    };
    let store = Arc::new(SemanticStore::new(
        index,
        Arc::clone(&store_breaker),
        store_config,
    ));
    store.ensure_ready().await?;
    tracing::info!(collection = %config.collection_name, "Cache collection ready");

    let sweeper = spawn_sweeper(
        Arc::clone(&store),
        Duration::from_secs(config.sweep_interval_secs),
    );

    let backend = LlmBackend::new(config.llm_model.clone(), Arc::clone(&backend_breaker));

    let pipeline = Arc::new(QueryPipeline::new(
        Arc::clone(&embedder),
        Arc::clone(&store),
        backend,
        Arc::clone(&metrics),
    ));

    let state = AppState {
        pipeline,
        metrics,
        store,
        embedder,
        backend_breaker,
    };
    let app = create_router(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    tracing::info!("Recall shutdown complete");
    Ok(())
}

fn run_health_check() -> i32 {
    let port = std::env::var("RECALL_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

    let url = format!("http://127.0.0.1:{}/health", port);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build runtime");

    rt.block_on(async {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(1))
            .build()
            .expect("failed to build client");

        match client.get(&url).send().await {
            Ok(res) if res.status().is_success() => 0,
            _ => 1,
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
