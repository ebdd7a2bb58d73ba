use std::sync::Arc;

use axum::{extract::State, response::Json};
use serde_json::{Value, json};
use tracing::warn;

use crate::{server::AppState, utils};

/// Liveness plus the age of every cached time range. A database failure
/// reports `degraded` instead of failing the request.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let now = utils::now_ms();

    let (status, cache) = match state.data.cache().all().await {
        Ok(entries) => {
            let cache: serde_json::Map<String, Value> = entries
                .into_iter()
                .map(|entry| {
                    (
                        entry.time_range.to_string(),
                        json!(utils::format_age(now - entry.created_at)),
                    )
                })
                .collect();
            ("ok", Value::Object(cache))
        }
        Err(e) => {
            warn!("Health check could not read the cache: {}", e);
            ("degraded", Value::Null)
        }
    };

    Json(json!({
        "status": status,
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "cache": cache
    }))
}
