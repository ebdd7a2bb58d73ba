use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Query, State},
    response::Html,
};
use tokio::sync::Mutex;
use tracing::warn;

use crate::{
    spotify::SpotifyClient,
    types::PendingAuth,
    utils::{self, CallbackParams},
};

/// Shared between the waiting `auth --listen` command and the callback
/// handler.
#[derive(Clone)]
pub struct CallbackState {
    pub pending: Arc<Mutex<Option<PendingAuth>>>,
    pub client: SpotifyClient,
    pub redirect_uri: String,
}

pub async fn callback(
    State(state): State<CallbackState>,
    Query(mut query): Query<HashMap<String, String>>,
) -> Html<&'static str> {
    let mut pending = state.pending.lock().await;
    let Some(pending) = pending.as_mut() else {
        return Html("<h4>No authorization in progress.</h4>");
    };

    let params = CallbackParams {
        code: query.remove("code"),
        state: query.remove("state"),
        error: query.remove("error"),
    };

    let code = match utils::verify_callback(&params, &pending.state) {
        Ok(code) => code,
        Err(e) => {
            pending.error = Some(e.to_string());
            return Html("<h4>Login failed.</h4>");
        }
    };

    match state.client.exchange_code(&code, &state.redirect_uri).await {
        Ok(token) => {
            pending.token = Some(token);
            Html("<h2>Authentication successful.</h2><p>Close browser window.</p>")
        }
        Err(e) => {
            warn!("Token exchange failed: {}", e);
            pending.error = Some(format!("Failed to exchange code for tokens: {e}"));
            Html("<h4>Login failed.</h4>")
        }
    }
}
