//! HTTP surface for the task store and the AI proxy.

mod handlers;

use crate::ai::{AiProxy, CompletionProvider, HuggingFaceProvider, OpenRouterProvider};
use crate::config::Config;
use crate::store::{self, TaskStore};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TaskStore>,
    pub ai: Arc<AiProxy>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/tasks",
            get(handlers::list_tasks)
                .post(handlers::create_task)
                .put(handlers::update_task)
                .patch(handlers::complete_task)
                .delete(handlers::delete_task),
        )
        .route("/api/ai/schedule", post(handlers::schedule))
        .route("/api/ai/suggest", get(handlers::suggest))
        .route("/api/ai/custom", post(handlers::plan))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub fn build_proxy(config: &Config) -> anyhow::Result<AiProxy> {
    let chat: Arc<dyn CompletionProvider> = Arc::new(OpenRouterProvider::new(
        config.openrouter_base_url.clone(),
        config.openrouter_model.clone(),
        config.openrouter_api_key.clone(),
        config.request_timeout,
    )?);
    let plan: Arc<dyn CompletionProvider> = Arc::new(HuggingFaceProvider::new(
        config.hf_model_url.clone(),
        config.hf_api_key.clone(),
        config.request_timeout,
    )?);

    for provider in [&chat, &plan] {
        if !provider.is_configured() {
            tracing::warn!(
                "{} not set, {} requests will fail",
                provider.credential_var(),
                provider.name()
            );
        }
    }

    Ok(AiProxy::new(chat, plan))
}

pub async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = config.bind_addr()?;
    let state = AppState {
        store: store::connect(config.database_url.as_deref()).await?,
        ai: Arc::new(build_proxy(&config)?),
    };

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}
