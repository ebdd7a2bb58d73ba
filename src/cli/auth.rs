use std::{sync::Arc, time::Duration};

use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::Mutex,
    time::Instant,
};

use crate::{
    api::CallbackState,
    config::{self, Config},
    error, info,
    management::{TokenManager, db},
    server,
    spotify::SpotifyClient,
    success,
    types::{PendingAuth, TokenResponse},
    utils, warning,
};

const CALLBACK_TIMEOUT: Duration = Duration::from_secs(60);

/// Runs the authorization-code flow once and stores the owner's tokens.
///
/// The owner opens the printed authorize URL, grants access and is redirected
/// to the configured redirect URI. By default nothing listens there: the
/// owner copies the URL from the browser's address bar and pastes it on
/// stdin. With `listen`, a temporary local server on the redirect URI's port
/// receives the redirect instead.
///
/// Every failure is fatal and exits with status 1.
pub async fn auth(listen: bool) {
    info!("Environment variables loaded:");
    let mut missing = false;
    for (key, present) in config::credential_status() {
        info!("{}: {}", key, if present { "✓" } else { "✗" });
        missing |= !present;
    }
    if missing {
        error!("Missing Spotify credentials");
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => error!("Cannot load configuration. Err: {}", e),
    };

    warning!(
        "IMPORTANT: Make sure to add {} to your Spotify App's Redirect URIs",
        config.redirect_uri
    );
    info!("You can do this at https://developer.spotify.com/dashboard/applications");

    let client = SpotifyClient::new(&config);
    let state = utils::generate_state();
    let auth_url = match client.authorize_url(&state, &config.scope, &config.redirect_uri) {
        Ok(url) => url,
        Err(e) => error!("{}", e),
    };

    info!("Visit this URL to authorize Spotify:\n{}", auth_url);
    if webbrowser::open(&auth_url).is_err() {
        warning!("Failed to open browser. Please navigate to the URL above manually.");
    }

    let token = if listen {
        listen_for_token(&config, client, state).await
    } else {
        paste_for_token(&config, &client, &state).await
    };

    let pool = match db::init_database(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => error!("Cannot open database. Err: {}", e),
    };

    if let Err(e) = TokenManager::new(pool, config.owner_id.clone())
        .store(&token)
        .await
    {
        error!("Error storing tokens: {}", e);
    }

    success!("Successfully authenticated and stored tokens!");
}

async fn paste_for_token(config: &Config, client: &SpotifyClient, state: &str) -> TokenResponse {
    info!("After authorizing, you will be redirected to a non-existent page.");
    info!("Copy the URL from your browser and paste it here:");

    let mut line = String::new();
    if let Err(e) = BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
    {
        error!("Failed to read callback URL: {}", e);
    }

    let code = match utils::parse_callback_url(&line)
        .and_then(|params| utils::verify_callback(&params, state))
    {
        Ok(code) => code,
        Err(e) => error!("{}", e),
    };

    let pb = super::spinner("Exchanging code for tokens...".to_string());
    let result = client.exchange_code(&code, &config.redirect_uri).await;
    pb.finish_and_clear();

    match result {
        Ok(token) => token,
        Err(e) => error!("Failed to exchange code for tokens: {}", e),
    }
}

async fn listen_for_token(config: &Config, client: SpotifyClient, state: String) -> TokenResponse {
    let listeners = match utils::callback_bind_addrs(&config.redirect_uri) {
        Ok(addrs) => server::bind_callback(&addrs).await,
        Err(e) => Err(e),
    };
    let listeners = match listeners {
        Ok(listeners) => listeners,
        Err(e) => error!("Cannot start callback server. Err: {}", e),
    };

    let pending = Arc::new(Mutex::new(Some(PendingAuth {
        state,
        token: None,
        error: None,
    })));

    let callback_state = CallbackState {
        pending: Arc::clone(&pending),
        client,
        redirect_uri: config.redirect_uri.clone(),
    };
    let handle = tokio::spawn(async move {
        if let Err(e) = server::serve_callback(listeners, callback_state).await {
            warning!("Callback server stopped: {}", e);
        }
    });

    info!("Waiting for Spotify to redirect to {} ...", config.redirect_uri);
    let outcome = wait_for_token(pending).await;
    handle.abort();

    match outcome {
        Ok(token) => token,
        Err(e) => error!("{}", e),
    }
}

/// Polls the shared state until the callback handler stored a token or an
/// error, giving up after [`CALLBACK_TIMEOUT`].
async fn wait_for_token(pending: Arc<Mutex<Option<PendingAuth>>>) -> Result<TokenResponse, String> {
    let start = Instant::now();

    while start.elapsed() < CALLBACK_TIMEOUT {
        {
            let lock = pending.lock().await;
            if let Some(auth) = lock.as_ref() {
                if let Some(token) = &auth.token {
                    return Ok(token.clone());
                }
                if let Some(err) = &auth.error {
                    return Err(err.clone());
                }
            }
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    Err("Authentication failed or timed out.".to_string())
}
