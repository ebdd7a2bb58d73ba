use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{
    server::AppState,
    types::{SpotifyData, TimeRange},
};

#[derive(Debug, Deserialize)]
pub struct DataQuery {
    #[serde(rename = "timeRange")]
    pub time_range: Option<String>,
}

impl DataQuery {
    /// Requested range; absent or empty means the default.
    pub fn time_range(&self) -> crate::Result<TimeRange> {
        match self.time_range.as_deref() {
            None | Some("") => Ok(TimeRange::default()),
            Some(raw) => raw.parse(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Failed to fetch Spotify data")]
    FetchFailed,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::FetchFailed => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub async fn spotify_data(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DataQuery>,
) -> Result<Json<SpotifyData>, ApiError> {
    let range = query
        .time_range()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    match state.data.load(range).await {
        Ok(data) => Ok(Json(data)),
        Err(e) => {
            error!(time_range = %range, "Error fetching Spotify data: {}", e);
            Err(ApiError::FetchFailed)
        }
    }
}
