//! Configuration management for the portfolio server and CLI.
//!
//! Values come from environment variables, optionally seeded from `.env`
//! files. The lookup order is:
//! 1. Environment variables already set in the process (highest priority)
//! 2. `.env` in the current working directory
//! 3. `.env` in the local data directory (`spotfolio/.env`)
//! 4. Application defaults (where applicable)
//!
//! Only the Spotify client credentials are mandatory; every endpoint URL has a
//! default pointing at the public Spotify services so tests can override them
//! with a local mock.

use std::{env, path::PathBuf, time::Duration};

use crate::{Error, Result, types::SiteProfile, utils};

pub const APP_DIR: &str = "spotfolio";

pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:3000";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/callback";
pub const DEFAULT_SCOPE: &str = "user-top-read user-read-private user-read-email";
pub const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_OWNER_ID: &str = "owner";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Loads environment variables from `.env` files.
///
/// The working directory is checked first, then the platform-specific local
/// data directory:
/// - Linux: `~/.local/share/spotfolio/.env`
/// - macOS: `~/Library/Application Support/spotfolio/.env`
/// - Windows: `%LOCALAPPDATA%/spotfolio/.env`
///
/// `dotenv` never overrides variables that are already set, so whichever file
/// is loaded first wins. Missing files are not an error; a deployment may
/// configure everything through the real environment.
///
/// # Errors
///
/// Returns an error if the data directory cannot be created.
pub async fn load_env() -> Result<()> {
    let _ = dotenv::dotenv();

    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent).await?;
    }

    let _ = dotenv::from_path(path);
    Ok(())
}

/// Platform-specific directory holding the `.env` file and the database.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path
}

/// SQLite file, from `DATABASE_PATH` or inside [`data_dir`].
///
/// Read separately from [`Config`] so commands that only inspect the cache do
/// not need the client credentials.
pub fn database_path() -> PathBuf {
    env::var("DATABASE_PATH")
        .ok()
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir().join("spotfolio.db"))
}

/// Runtime configuration shared by the server and the CLI.
#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scope: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_url: String,
    /// Row key of the single owner in `spotify_tokens`.
    pub owner_id: String,
    pub server_addr: String,
    pub database_path: PathBuf,
    pub cache_ttl: Duration,
    /// Owner details rendered on the page.
    pub site: SiteProfile,
}

impl Config {
    /// Builds the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `SPOTIFY_CLIENT_ID` or
    /// `SPOTIFY_CLIENT_SECRET` is missing, if `CACHE_TTL_SECS` is not a
    /// whole number of seconds, or if `SITE_SOCIAL_LINKS` is malformed.
    pub fn from_env() -> Result<Self> {
        let cache_ttl_secs = match env::var("CACHE_TTL_SECS") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|e| {
                Error::Config(format!("CACHE_TTL_SECS must be a number of seconds: {e}"))
            })?,
            Err(_) => DEFAULT_CACHE_TTL_SECS,
        };

        Ok(Self {
            client_id: required("SPOTIFY_CLIENT_ID")?,
            client_secret: required("SPOTIFY_CLIENT_SECRET")?,
            redirect_uri: var_or("SPOTIFY_REDIRECT_URI", DEFAULT_REDIRECT_URI),
            scope: var_or("SPOTIFY_API_AUTH_SCOPE", DEFAULT_SCOPE),
            auth_url: var_or("SPOTIFY_API_AUTH_URL", DEFAULT_AUTH_URL),
            token_url: var_or("SPOTIFY_API_TOKEN_URL", DEFAULT_TOKEN_URL),
            api_url: var_or("SPOTIFY_API_URL", DEFAULT_API_URL),
            owner_id: var_or("SPOTIFY_OWNER_ID", DEFAULT_OWNER_ID),
            server_addr: var_or("SERVER_ADDRESS", DEFAULT_SERVER_ADDRESS),
            database_path: database_path(),
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            site: SiteProfile {
                owner_name: optional("SITE_OWNER_NAME"),
                photo_url: optional("SITE_PHOTO_URL"),
                snapcode_url: optional("SITE_SNAPCODE_URL"),
                social_links: match optional("SITE_SOCIAL_LINKS") {
                    Some(raw) => utils::parse_social_links(&raw)?,
                    None => Vec::new(),
                },
            },
        })
    }
}

/// Reports which credentials are present, in the order the auth command
/// prints them.
pub fn credential_status() -> Vec<(&'static str, bool)> {
    ["SPOTIFY_CLIENT_ID", "SPOTIFY_CLIENT_SECRET"]
        .into_iter()
        .map(|key| (key, env::var(key).is_ok_and(|v| !v.is_empty())))
        .collect()
}

fn required(key: &str) -> Result<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::Config(format!("{key} must be set"))),
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Trimmed value of `key`; unset and blank both mean `None`.
fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
