use std::{future::IntoFuture, net::SocketAddr, str::FromStr, sync::Arc};

use axum::{Router, routing::get};
use tokio::{net::TcpListener, task::JoinSet};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    Error, Result,
    api::{self, CallbackState},
    config::Config,
    management::{DataService, db},
    spotify::SpotifyClient,
    types::SiteProfile,
};

/// Application state
pub struct AppState {
    pub data: DataService,
    pub site: SiteProfile,
}

impl AppState {
    pub fn new(data: DataService, config: &Config) -> Self {
        Self {
            data,
            site: config.site.clone(),
        }
    }
}

/// Routes of the public site.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(api::index))
        .route("/health", get(api::health))
        .route("/api/spotify/data", get(api::spotify_data))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Starts the portfolio server and runs until Ctrl-C.
pub async fn start_api_server(config: &Config) -> Result<()> {
    let pool = db::init_database(&config.database_path).await?;
    let data = DataService::new(SpotifyClient::new(config), pool, config);
    let app = router(Arc::new(AppState::new(data, config)));

    let addr = parse_addr(&config.server_addr)?;
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

/// Routes served while `auth --listen` waits for the redirect.
pub fn callback_router(state: CallbackState) -> Router {
    Router::new()
        .route("/callback", get(api::callback))
        .with_state(state)
}

/// Binds every address the redirect may arrive on.
///
/// `localhost` resolves to `127.0.0.1` or `::1` depending on the browser, so
/// a failure on one of several addresses is only logged.
///
/// # Errors
///
/// Returns the last bind error when no address could be bound.
pub async fn bind_callback(addrs: &[SocketAddr]) -> Result<Vec<TcpListener>> {
    let mut listeners = Vec::with_capacity(addrs.len());
    let mut last_error = None;

    for addr in addrs {
        match TcpListener::bind(addr).await {
            Ok(listener) => listeners.push(listener),
            Err(e) => {
                warn!("Cannot bind callback listener on {}: {}", addr, e);
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) if listeners.is_empty() => Err(e.into()),
        _ if listeners.is_empty() => Err(Error::Config(
            "No address to listen on for the callback".to_string(),
        )),
        _ => Ok(listeners),
    }
}

/// Serves [`callback_router`] on every listener until one of them stops.
/// `auth --listen` aborts the task once a token or an error arrived.
pub async fn serve_callback(listeners: Vec<TcpListener>, state: CallbackState) -> Result<()> {
    let app = callback_router(state);
    let mut servers = JoinSet::new();
    for listener in listeners {
        servers.spawn(axum::serve(listener, app.clone()).into_future());
    }

    match servers.join_next().await {
        Some(Ok(result)) => result.map_err(Error::from),
        Some(Err(e)) => Err(Error::Io(std::io::Error::other(e))),
        None => Ok(()),
    }
}

pub fn parse_addr(raw: &str) -> Result<SocketAddr> {
    SocketAddr::from_str(raw)
        .map_err(|e| Error::Config(format!("Failed to parse server address '{raw}': {e}")))
}

/// Installs the `tracing` subscriber; `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("spotfolio=info,tower_http=info"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
