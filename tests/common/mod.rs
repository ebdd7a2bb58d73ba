//! In-process stand-in for the Spotify accounts service and Web API, plus
//! helpers to run the portfolio router against it.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    net::SocketAddr,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Form, Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tokio::{net::TcpListener, sync::Mutex};

use spotfolio::{
    config::{Config, DEFAULT_SCOPE},
    management::{DataService, TokenManager, db},
    server::{self, AppState},
    spotify::SpotifyClient,
    types::{SiteProfile, TokenResponse},
};

pub const CLIENT_ID: &str = "client-id";
pub const CLIENT_SECRET: &str = "client-secret";
pub const REDIRECT_URI: &str = "http://localhost:3000/callback";
pub const GOOD_CODE: &str = "good-code";
pub const REFRESH_TOKEN: &str = "refresh-1";
pub const REFRESHED_ACCESS_TOKEN: &str = "access-2";

pub const ARTIST_GENRES: [&[&str]; 8] = [
    &["indie rock", "dream pop"],
    &["dream pop", "shoegaze"],
    &["indie rock", "post-punk", "new wave"],
    &["synthpop"],
    &["art pop", "synthpop"],
    &["chamber pop"],
    &["jazz"],
    &[],
];

#[derive(Default)]
pub struct MockSpotify {
    pub token_calls: AtomicUsize,
    pub artist_calls: AtomicUsize,
    pub track_calls: AtomicUsize,
    /// Makes `/me/top/tracks` answer 502.
    pub fail_tracks: AtomicBool,
    /// Rotate the refresh token on the next refresh.
    pub rotate_refresh_token: AtomicBool,
    pub bearer_tokens: Mutex<Vec<String>>,
    pub top_queries: Mutex<Vec<HashMap<String, String>>>,
}

impl MockSpotify {
    pub fn calls(&self) -> (usize, usize, usize) {
        (
            self.token_calls.load(Ordering::SeqCst),
            self.artist_calls.load(Ordering::SeqCst),
            self.track_calls.load(Ordering::SeqCst),
        )
    }
}

/// Starts the mock and returns its base URL.
pub async fn start_mock_spotify(mock: Arc<MockSpotify>) -> String {
    let app = Router::new()
        .route("/api/token", post(token))
        .route("/v1/me/top/artists", get(top_artists))
        .route("/v1/me/top/tracks", get(top_tracks))
        .with_state(mock);

    let addr = serve(app).await;
    format!("http://{addr}")
}

pub fn test_config(base_url: &str) -> Config {
    Config {
        client_id: CLIENT_ID.to_string(),
        client_secret: CLIENT_SECRET.to_string(),
        redirect_uri: REDIRECT_URI.to_string(),
        scope: DEFAULT_SCOPE.to_string(),
        auth_url: format!("{base_url}/authorize"),
        token_url: format!("{base_url}/api/token"),
        api_url: format!("{base_url}/v1"),
        owner_id: "owner".to_string(),
        server_addr: "127.0.0.1:0".to_string(),
        database_path: PathBuf::from(":memory:"),
        cache_ttl: Duration::from_secs(3600),
        site: SiteProfile {
            owner_name: Some("Jane Doe".to_string()),
            ..SiteProfile::default()
        },
    }
}

/// Stores a token for the owner that expires `expires_in` seconds from now.
pub async fn seed_token(pool: &SqlitePool, config: &Config, expires_in: u64) {
    TokenManager::new(pool.clone(), config.owner_id.clone())
        .store(&TokenResponse {
            access_token: "access-1".to_string(),
            token_type: Some("Bearer".to_string()),
            scope: Some(DEFAULT_SCOPE.to_string()),
            expires_in,
            refresh_token: Some(REFRESH_TOKEN.to_string()),
        })
        .await
        .expect("Failed to seed token");
}

pub struct TestApp {
    pub base_url: String,
    pub pool: SqlitePool,
    pub mock: Arc<MockSpotify>,
    pub config: Config,
}

/// Mock upstream, in-memory database and the portfolio router, all wired
/// together. `configure` may adjust the config before the app is built.
pub async fn spawn_app(configure: impl FnOnce(&mut Config)) -> TestApp {
    let mock = Arc::new(MockSpotify::default());
    let upstream = start_mock_spotify(Arc::clone(&mock)).await;

    let mut config = test_config(&upstream);
    configure(&mut config);

    let pool = db::init_memory().await.expect("Failed to create test database");
    let data = DataService::new(SpotifyClient::new(&config), pool.clone(), &config);
    let app = server::router(Arc::new(AppState::new(data, &config)));
    let addr = serve(app).await;

    TestApp {
        base_url: format!("http://{addr}"),
        pool,
        mock,
        config,
    }
}

pub async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub fn artist_json(index: usize) -> Value {
    json!({
        "id": format!("artist-{index}"),
        "name": format!("Artist {index}"),
        "genres": ARTIST_GENRES[index],
        "images": [{ "url": format!("https://i.scdn.co/image/a{index}"), "height": 640, "width": 640 }],
        "popularity": 70,
        "type": "artist",
        "uri": format!("spotify:artist:{index}"),
        "external_urls": { "spotify": format!("https://open.spotify.com/artist/{index}") }
    })
}

pub fn track_json(index: usize) -> Value {
    json!({
        "id": format!("track-{index}"),
        "name": format!("Track {index}"),
        "artists": [{ "id": "artist-0", "name": "Artist 0" }, { "id": "artist-1", "name": "Artist 1" }],
        "album": {
            "id": format!("album-{index}"),
            "name": format!("Album {index}"),
            "images": [{ "url": format!("https://i.scdn.co/image/t{index}") }]
        },
        "duration_ms": 200000,
        "explicit": false
    })
}

async fn token(
    State(mock): State<Arc<MockSpotify>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    mock.token_calls.fetch_add(1, Ordering::SeqCst);

    let expected = spotfolio::utils::basic_auth_value(CLIENT_ID, CLIENT_SECRET);
    if headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) != Some(expected.as_str()) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid_client" })),
        )
            .into_response();
    }

    let grant = form.get("grant_type").map(String::as_str);
    match grant {
        Some("authorization_code")
            if form.get("code").map(String::as_str) == Some(GOOD_CODE)
                && form.get("redirect_uri").map(String::as_str) == Some(REDIRECT_URI) =>
        {
            Json(json!({
                "access_token": "access-1",
                "token_type": "Bearer",
                "scope": DEFAULT_SCOPE,
                "expires_in": 3600,
                "refresh_token": REFRESH_TOKEN
            }))
            .into_response()
        }
        Some("refresh_token") if form.get("refresh_token").is_some() => {
            let mut body = json!({
                "access_token": REFRESHED_ACCESS_TOKEN,
                "token_type": "Bearer",
                "scope": DEFAULT_SCOPE,
                "expires_in": 3600
            });
            if mock.rotate_refresh_token.load(Ordering::SeqCst) {
                body["refresh_token"] = json!("refresh-2");
            }
            Json(body).into_response()
        }
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "Invalid authorization code" })),
        )
            .into_response(),
    }
}

async fn top_artists(
    State(mock): State<Arc<MockSpotify>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    mock.artist_calls.fetch_add(1, Ordering::SeqCst);
    record(&mock, &headers, query.clone()).await;

    let limit = limit(&query);
    let items: Vec<Value> = (0..ARTIST_GENRES.len()).take(limit).map(artist_json).collect();
    Json(json!({ "items": items, "total": ARTIST_GENRES.len(), "limit": limit })).into_response()
}

async fn top_tracks(
    State(mock): State<Arc<MockSpotify>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    mock.track_calls.fetch_add(1, Ordering::SeqCst);
    record(&mock, &headers, query.clone()).await;

    if mock.fail_tracks.load(Ordering::SeqCst) {
        return (StatusCode::BAD_GATEWAY, "upstream unavailable").into_response();
    }

    let limit = limit(&query);
    let items: Vec<Value> = (0..7).take(limit).map(track_json).collect();
    Json(json!({ "items": items, "total": 7, "limit": limit })).into_response()
}

async fn record(mock: &MockSpotify, headers: &HeaderMap, query: HashMap<String, String>) {
    if let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        mock.bearer_tokens.lock().await.push(value.to_string());
    }
    mock.top_queries.lock().await.push(query);
}

fn limit(query: &HashMap<String, String>) -> usize {
    query
        .get("limit")
        .and_then(|l| l.parse().ok())
        .unwrap_or(20)
}
