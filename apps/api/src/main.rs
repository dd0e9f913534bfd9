mod config;
mod errors;
mod interview;
mod llm_client;
mod pdf;
mod routes;
mod session;
mod state;
#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, SessionBackend};
use crate::llm_client::gemini::GeminiBackend;
use crate::llm_client::retry::RetryPolicy;
use crate::llm_client::LlmClient;
use crate::pdf::PdfExtractText;
use crate::routes::build_router;
use crate::session::{spawn_sweeper, InMemorySessionStore, RedisSessionStore, SessionStore};
use crate::state::AppState;

const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log,
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting MockMate API v{}", env!("CARGO_PKG_VERSION"));

    let shutdown = CancellationToken::new();

    // AI endpoints answer 500 until a key is configured; health and upload validation still work.
    let llm = match &config.gemini_api_key {
        Some(key) => {
            let backend = GeminiBackend::new(key.clone())?;
            let retry = RetryPolicy {
                max_attempts: config.llm_max_attempts,
                base_delay: config.llm_base_delay,
            };
            info!(
                "LLM client initialized (fast: {:?}, default: {:?})",
                config.models.fast, config.models.default
            );
            Some(LlmClient::new(Arc::new(backend), &config.models, retry))
        }
        None => {
            warn!("GEMINI_API_KEY is not set; AI endpoints will fail");
            None
        }
    };

    let sessions: Arc<dyn SessionStore> = match &config.session_backend {
        SessionBackend::Memory => {
            let store: Arc<dyn SessionStore> =
                Arc::new(InMemorySessionStore::new(config.session_ttl));
            spawn_sweeper(store.clone(), SWEEP_INTERVAL, shutdown.clone());
            info!("In-memory session store (ttl {}s)", config.session_ttl.as_secs());
            store
        }
        SessionBackend::Redis { url } => {
            let store = RedisSessionStore::connect(url, config.session_ttl)
                .await
                .context("Failed to connect to Redis")?;
            info!("Redis session store (ttl {}s)", config.session_ttl.as_secs());
            Arc::new(store)
        }
    };

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .allow_origin
                .parse::<HeaderValue>()
                .context("ALLOW_ORIGIN is not a valid header value")?,
        )
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let state = AppState {
        llm,
        sessions,
        pdf: Arc::new(PdfExtractText),
        config: config.clone(),
        shutdown: shutdown.clone(),
    };

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM, cancelling in-flight model work.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
    shutdown.cancel();
}
