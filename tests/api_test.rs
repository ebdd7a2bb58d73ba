mod common;

use std::{
    sync::{Arc, atomic::Ordering},
    time::Duration,
};

use reqwest::StatusCode;
use serde_json::Value;
use tokio::sync::Mutex;

use common::*;
use spotfolio::{
    Error,
    api::CallbackState,
    management::{CacheManager, TokenManager},
    server,
    spotify::SpotifyClient,
    types::{PendingAuth, SpotifyData, TimeRange},
};

async fn get_data(app: &TestApp, query: &str) -> (StatusCode, Value) {
    let response = reqwest::get(format!("{}/api/spotify/data{}", app.base_url, query))
        .await
        .unwrap();
    let status = response.status();
    (status, response.json::<Value>().await.unwrap())
}

#[tokio::test]
async fn test_cache_miss_fetches_and_stores() {
    let app = spawn_app(|_| {}).await;
    seed_token(&app.pool, &app.config, 3600).await;

    let (status, body) = get_data(&app, "?timeRange=short_term").await;
    assert_eq!(status, StatusCode::OK);

    let data: SpotifyData = serde_json::from_value(body.clone()).unwrap();
    assert_eq!(data.time_range, TimeRange::ShortTerm);
    assert_eq!(data.artists.len(), 6);
    assert_eq!(data.tracks.len(), 5);
    assert_eq!(
        data.genres,
        vec![
            "indie rock",
            "dream pop",
            "shoegaze",
            "post-punk",
            "new wave",
            "synthpop"
        ]
    );
    assert_eq!(body["timeRange"], "short_term");
    assert_eq!(body["tracks"][0]["album"]["images"][0]["url"], "https://i.scdn.co/image/t0");

    // Stored token was still valid, so no refresh happened
    assert_eq!(app.mock.calls(), (0, 1, 1));
    let bearer = app.mock.bearer_tokens.lock().await.clone();
    assert!(bearer.iter().all(|b| b == "Bearer access-1"));

    let queries = app.mock.top_queries.lock().await.clone();
    assert!(queries.iter().all(|q| q["time_range"] == "short_term"));
    let mut limits: Vec<&str> = queries.iter().map(|q| q["limit"].as_str()).collect();
    limits.sort();
    assert_eq!(limits, vec!["5", "6"]);

    let cached = CacheManager::new(app.pool.clone())
        .latest(TimeRange::ShortTerm)
        .await
        .unwrap()
        .expect("data should be cached");
    assert_eq!(SpotifyData::from(cached), data);
}

#[tokio::test]
async fn test_fresh_cache_is_served_without_upstream_calls() {
    let app = spawn_app(|_| {}).await;

    seed_token(&app.pool, &app.config, 3600).await;
    let first = get_data(&app, "?timeRange=long_term").await;
    assert_eq!(first.0, StatusCode::OK);

    // A cache hit must not need the token at all
    sqlx::query("DELETE FROM spotify_tokens")
        .execute(&app.pool)
        .await
        .unwrap();

    let second = get_data(&app, "?timeRange=long_term").await;
    assert_eq!(second.0, StatusCode::OK);
    assert_eq!(second.1, first.1);
    assert_eq!(app.mock.calls(), (0, 1, 1));
}

#[tokio::test]
async fn test_stale_cache_is_refetched() {
    let app = spawn_app(|config| config.cache_ttl = Duration::ZERO).await;
    seed_token(&app.pool, &app.config, 3600).await;

    assert_eq!(get_data(&app, "").await.0, StatusCode::OK);
    assert_eq!(get_data(&app, "").await.0, StatusCode::OK);

    assert_eq!(app.mock.calls(), (0, 2, 2));
}

#[tokio::test]
async fn test_time_ranges_are_cached_separately() {
    let app = spawn_app(|_| {}).await;
    seed_token(&app.pool, &app.config, 3600).await;

    get_data(&app, "?timeRange=short_term").await;
    get_data(&app, "?timeRange=medium_term").await;
    get_data(&app, "?timeRange=short_term").await;

    assert_eq!(app.mock.calls(), (0, 2, 2));
    assert_eq!(
        CacheManager::new(app.pool.clone()).all().await.unwrap().len(),
        2
    );
}

#[tokio::test]
async fn test_missing_time_range_defaults_to_medium_term() {
    let app = spawn_app(|_| {}).await;
    seed_token(&app.pool, &app.config, 3600).await;

    let (status, body) = get_data(&app, "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timeRange"], "medium_term");

    let (status, body) = get_data(&app, "?timeRange=").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timeRange"], "medium_term");
}

#[tokio::test]
async fn test_invalid_time_range_is_rejected() {
    let app = spawn_app(|_| {}).await;
    seed_token(&app.pool, &app.config, 3600).await;

    let (status, body) = get_data(&app, "?timeRange=forever").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid time range: forever");
    assert_eq!(app.mock.calls(), (0, 0, 0));
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_persisted() {
    let app = spawn_app(|_| {}).await;
    seed_token(&app.pool, &app.config, 0).await;

    let (status, _) = get_data(&app, "?timeRange=short_term").await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(app.mock.calls(), (1, 1, 1));
    let bearer = app.mock.bearer_tokens.lock().await.clone();
    assert!(bearer.iter().all(|b| b == "Bearer access-2"));

    let stored = TokenManager::new(app.pool.clone(), "owner")
        .load()
        .await
        .unwrap();
    assert_eq!(stored.access_token, REFRESHED_ACCESS_TOKEN);
    // Spotify did not rotate the refresh token, so the old one is kept
    assert_eq!(stored.refresh_token, REFRESH_TOKEN);
    assert!(!stored.is_expired(spotfolio::utils::now_ms()));
}

#[tokio::test]
async fn test_rotated_refresh_token_is_stored() {
    let app = spawn_app(|_| {}).await;
    app.mock.rotate_refresh_token.store(true, Ordering::SeqCst);
    seed_token(&app.pool, &app.config, 0).await;

    assert_eq!(get_data(&app, "").await.0, StatusCode::OK);

    let stored = TokenManager::new(app.pool.clone(), "owner")
        .load()
        .await
        .unwrap();
    assert_eq!(stored.refresh_token, "refresh-2");
}

#[tokio::test]
async fn test_upstream_failure_returns_500_and_caches_nothing() {
    let app = spawn_app(|_| {}).await;
    app.mock.fail_tracks.store(true, Ordering::SeqCst);
    seed_token(&app.pool, &app.config, 3600).await;

    let (status, body) = get_data(&app, "?timeRange=short_term").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to fetch Spotify data");

    let cached = CacheManager::new(app.pool.clone())
        .latest(TimeRange::ShortTerm)
        .await
        .unwrap();
    assert!(cached.is_none());
}

#[tokio::test]
async fn test_missing_token_returns_500() {
    let app = spawn_app(|_| {}).await;

    let (status, body) = get_data(&app, "").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to fetch Spotify data");
    assert_eq!(app.mock.calls(), (0, 0, 0));
}

#[tokio::test]
async fn test_health_and_index() {
    let app = spawn_app(|_| {}).await;

    let health: Value = reqwest::get(format!("{}/health", app.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(health["cache"], serde_json::json!({}));

    seed_token(&app.pool, &app.config, 3600).await;
    get_data(&app, "?timeRange=short_term").await;
    let health: Value = reqwest::get(format!("{}/health", app.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(health["cache"]["short_term"].as_str().unwrap().ends_with('s'));
    assert!(health["cache"].get("long_term").is_none());

    let response = reqwest::get(format!("{}/", app.base_url)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/html")
    );
    let page = response.text().await.unwrap();
    assert!(page.contains("<h1>JANE DOE</h1>"));
}

#[tokio::test]
async fn test_cors_headers_are_set() {
    let app = spawn_app(|_| {}).await;

    let response = reqwest::Client::new()
        .get(format!("{}/health", app.base_url))
        .header("Origin", "https://example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_authorize_url() {
    let config = test_config("https://accounts.example.com");
    let client = SpotifyClient::new(&config);

    let url = client
        .authorize_url("state123", &config.scope, REDIRECT_URI)
        .unwrap();
    let url = reqwest::Url::parse(&url).unwrap();

    assert_eq!(url.host_str(), Some("accounts.example.com"));
    assert_eq!(url.path(), "/authorize");
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert_eq!(
        pairs,
        vec![
            ("response_type".to_string(), "code".to_string()),
            ("client_id".to_string(), CLIENT_ID.to_string()),
            (
                "scope".to_string(),
                "user-top-read user-read-private user-read-email".to_string()
            ),
            ("redirect_uri".to_string(), REDIRECT_URI.to_string()),
            ("state".to_string(), "state123".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_exchange_code() {
    let mock = Arc::new(MockSpotify::default());
    let base = start_mock_spotify(Arc::clone(&mock)).await;
    let client = SpotifyClient::new(&test_config(&base));

    let token = client.exchange_code(GOOD_CODE, REDIRECT_URI).await.unwrap();
    assert_eq!(token.access_token, "access-1");
    assert_eq!(token.refresh_token.as_deref(), Some(REFRESH_TOKEN));
    assert_eq!(token.expires_in, 3600);

    let err = client.exchange_code("bad-code", REDIRECT_URI).await.unwrap_err();
    match err {
        Error::Upstream { status, body } => {
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body.contains("invalid_grant"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_exchange_code_with_wrong_secret() {
    let mock = Arc::new(MockSpotify::default());
    let base = start_mock_spotify(Arc::clone(&mock)).await;
    let mut config = test_config(&base);
    config.client_secret = "wrong".to_string();

    let err = SpotifyClient::new(&config)
        .exchange_code(GOOD_CODE, REDIRECT_URI)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Upstream { status, .. } if status == StatusCode::UNAUTHORIZED
    ));
}

async fn spawn_callback(pending: Arc<Mutex<Option<PendingAuth>>>) -> String {
    let mock = Arc::new(MockSpotify::default());
    let base = start_mock_spotify(mock).await;

    let state = CallbackState {
        pending,
        client: SpotifyClient::new(&test_config(&base)),
        redirect_uri: REDIRECT_URI.to_string(),
    };
    format!("http://{}", serve(server::callback_router(state)).await)
}

fn pending(state: &str) -> Arc<Mutex<Option<PendingAuth>>> {
    Arc::new(Mutex::new(Some(PendingAuth {
        state: state.to_string(),
        token: None,
        error: None,
    })))
}

#[tokio::test]
async fn test_callback_exchanges_code() {
    let pending = pending("abc");
    let base = spawn_callback(Arc::clone(&pending)).await;

    let page = reqwest::get(format!("{base}/callback?code={GOOD_CODE}&state=abc"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("Authentication successful"));

    let lock = pending.lock().await;
    let auth = lock.as_ref().unwrap();
    assert_eq!(auth.token.as_ref().unwrap().access_token, "access-1");
    assert!(auth.error.is_none());
}

#[tokio::test]
async fn test_callback_rejects_state_mismatch() {
    let pending = pending("abc");
    let base = spawn_callback(Arc::clone(&pending)).await;

    let page = reqwest::get(format!("{base}/callback?code={GOOD_CODE}&state=evil"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("Login failed"));

    let lock = pending.lock().await;
    let auth = lock.as_ref().unwrap();
    assert!(auth.token.is_none());
    assert_eq!(
        auth.error.as_deref(),
        Some("Authentication error: State mismatch. Expected: abc Got: evil")
    );
}

#[tokio::test]
async fn test_callback_reports_failed_exchange() {
    let pending = pending("abc");
    let base = spawn_callback(Arc::clone(&pending)).await;

    reqwest::get(format!("{base}/callback?code=expired&state=abc"))
        .await
        .unwrap();

    let lock = pending.lock().await;
    let error = lock.as_ref().unwrap().error.clone().unwrap();
    assert!(error.starts_with("Failed to exchange code for tokens"));
    assert!(error.contains("invalid_grant"));
}

#[tokio::test]
async fn test_callback_router_serves_only_callback() {
    let base = spawn_callback(pending("abc")).await;

    let response = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = reqwest::get(format!("{base}/api/spotify/data")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_callback_server_receives_redirect() {
    let mock = Arc::new(MockSpotify::default());
    let base = start_mock_spotify(mock).await;
    let pending = pending("abc");
    let state = CallbackState {
        pending: Arc::clone(&pending),
        client: SpotifyClient::new(&test_config(&base)),
        redirect_uri: REDIRECT_URI.to_string(),
    };

    let listeners = server::bind_callback(&["127.0.0.1:0".parse().unwrap()])
        .await
        .unwrap();
    let addr = listeners[0].local_addr().unwrap();
    let handle = tokio::spawn(server::serve_callback(listeners, state));

    let page = reqwest::get(format!("http://{addr}/callback?code={GOOD_CODE}&state=abc"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("Authentication successful"));
    assert!(pending.lock().await.as_ref().unwrap().token.is_some());

    handle.abort();
}

#[tokio::test]
async fn test_bind_callback_tolerates_one_unavailable_address() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let taken_addr = taken.local_addr().unwrap();

    let listeners = server::bind_callback(&[taken_addr, "127.0.0.1:0".parse().unwrap()])
        .await
        .unwrap();
    assert_eq!(listeners.len(), 1);

    assert!(server::bind_callback(&[taken_addr]).await.is_err());
    assert!(server::bind_callback(&[]).await.is_err());
}
