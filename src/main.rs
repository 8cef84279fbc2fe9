use std::sync::Arc;

use guru_recs::{
    api::{create_router, AppState},
    config::Config,
    search::{EsClient, SearchBackend},
    services::RecommendationService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("guru_recs=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let backend: Arc<dyn SearchBackend> = Arc::new(EsClient::new(
        config.elasticsearch_endpoint.clone(),
        config.elasticsearch_api_key.clone(),
    ));
    let service = Arc::new(RecommendationService::new(
        backend,
        config.boardgame_index.clone(),
        config.user_action_index.clone(),
    ));

    // Index bootstrap is best-effort: the service still answers with
    // degraded responses while the backend is unreachable.
    if let Err(e) = service.ensure_indices().await {
        tracing::warn!(error = %e, "Index bootstrap failed, continuing without it");
    }

    let state = AppState::new(service);
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Recommendation service listening");
    axum::serve(listener, app).await?;

    Ok(())
}
