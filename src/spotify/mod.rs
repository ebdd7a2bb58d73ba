//! # Spotify Integration Module
//!
//! Thin client for the two Spotify services the portfolio needs:
//!
//! - the **accounts service**, for the authorization-code exchange and token
//!   refresh ([`auth`]);
//! - the **Web API**, for the owner's top artists and tracks ([`top`]).
//!
//! ```text
//! api / cli
//!     ↓
//! management (tokens, cache)
//!     ↓
//! SpotifyClient ──► accounts.spotify.com/api/token
//!               └─► api.spotify.com/v1/me/top/{artists,tracks}
//! ```
//!
//! All base URLs come from [`Config`], so tests point the client at a local
//! mock server.
//!
//! Every call is a single attempt. A non-success status is turned into
//! [`Error::Upstream`](crate::Error::Upstream) carrying the response body,
//! which the caller logs.

use reqwest::{Client, Response};

use crate::{Error, Result, config::Config};

pub mod auth;
pub mod top;

/// Number of artists requested per time range.
pub const TOP_ARTISTS_LIMIT: u32 = 6;
/// Number of tracks requested per time range.
pub const TOP_TRACKS_LIMIT: u32 = 5;

#[derive(Debug, Clone)]
pub struct SpotifyClient {
    http: Client,
    api_url: String,
    auth_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl SpotifyClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

/// Passes successful responses through and turns everything else into
/// [`Error::Upstream`].
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::Upstream { status, body })
}
