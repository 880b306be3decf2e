//! HTTP surface: `POST /webhooks/{provider}` and `GET /zen`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Router;

use crate::{Mind, Provider, WebhookEndpoint, WebhookError};

/// Shared request state.
#[derive(Clone)]
pub struct AppState {
    endpoints: Arc<HashMap<Provider, WebhookEndpoint>>,
    mind: Arc<Mind>,
}

impl AppState {
    pub fn new(endpoints: impl IntoIterator<Item = WebhookEndpoint>, mind: Arc<Mind>) -> Self {
        let endpoints = endpoints
            .into_iter()
            .map(|endpoint| (endpoint.provider(), endpoint))
            .collect();
        Self {
            endpoints: Arc::new(endpoints),
            mind,
        }
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhooks/{provider}", post(receive_webhook))
        .route("/zen", get(zen))
        .with_state(state)
}

async fn receive_webhook(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, WebhookError> {
    let endpoint = provider
        .parse::<Provider>()
        .ok()
        .and_then(|provider| state.endpoints.get(&provider))
        .ok_or_else(|| WebhookError::UnknownProvider(provider.clone()))?;

    endpoint.handle(&headers, &body).await?;
    Ok(StatusCode::OK)
}

async fn zen(State(state): State<AppState>) -> String {
    state.mind.zen().await
}
