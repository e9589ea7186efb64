//! HTTP façade: `POST /init` loads knowledge, `POST /chat` answers questions.

use std::{env, sync::Arc};

mod core;
mod error_handler;
mod middleware_layer;
mod routes;

pub use crate::core::app_state::AppState;
pub use crate::error_handler::{AppError, AppResult};

use axum::{Router, middleware, routing::post};
use tokio::signal;
use tracing::{error, info};

use crate::middleware_layer::request_trace::request_trace;
use crate::routes::{chat::chat_route::chat, init_route::init_knowledge};

pub const DEFAULT_ADDRESS: &str = "0.0.0.0:3000";

/// Builds the router over an already wired state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/init", post(init_knowledge))
        .route("/chat", post(chat))
        .layer(middleware::from_fn(request_trace))
        .with_state(state)
}

/// Wires state from the environment and serves until Ctrl+C.
pub async fn start() -> Result<(), AppError> {
    let host_url = env::var("API_ADDRESS")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ADDRESS.to_string());

    let state = Arc::new(AppState::from_env().await?);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&host_url)
        .await
        .map_err(AppError::Bind)?;
    info!(address = %host_url, "chatbot server running");

    // Start server with graceful shutdown on Ctrl+C
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    info!("server stopped");
    Ok(())
}

/// Resolves when Ctrl+C is pressed.
async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
