use std::sync::Arc;

use anyhow::Context;
use seedmix_api::{
    api::{create_router, AppState, RequestDefaults},
    cache::{create_redis_client, Cache, CacheWriterHandle},
    config::Config,
    services::{RecommendationEngine, SpotifyCatalog},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("seedmix_api=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    // Redis is optional; without it every catalog call goes to origin
    let (cache, cache_handle): (Option<Cache>, Option<CacheWriterHandle>) =
        match &config.redis_url {
            Some(url) => {
                let client = create_redis_client(url)?;
                let (cache, handle) = Cache::new(client);
                (Some(cache), Some(handle))
            }
            None => {
                tracing::warn!("REDIS_URL not set, catalog responses will not be cached");
                (None, None)
            }
        };

    let catalog = Arc::new(
        SpotifyCatalog::new(config.spotify_api_url.clone(), cache, config.call_timeout())
            .context("Failed to build catalog client")?,
    );

    let engine = RecommendationEngine::new(catalog.clone(), catalog.clone(), config.engine_config())
        .with_keyword_picker(config.keyword_picker());

    let state = AppState::new(
        catalog.clone(),
        catalog,
        engine,
        RequestDefaults {
            region: config.default_region.clone(),
            limit: config.default_limit,
        },
    );

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = cache_handle {
        handle.shutdown().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}
