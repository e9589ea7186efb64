//! POST /init: loads the configured knowledge source into the vector store.

use std::sync::Arc;

use axum::extract::State;

use crate::{core::app_state::AppState, error_handler::AppResult};

/// Handler: POST /init
///
/// Ingestion completes before the response is sent.
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:3000/init
/// ```
pub async fn init_knowledge(State(state): State<Arc<AppState>>) -> AppResult<String> {
    let written = state.rag.load_knowledge(&state.knowledge).await?;
    Ok(format!(
        "Documents added to {} ({written} chunks)",
        state.rag.store().backend()
    ))
}
