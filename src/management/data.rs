use std::time::Duration;

use sqlx::SqlitePool;
use tracing::{debug, error, info};

use crate::{
    Result,
    config::Config,
    management::{CacheManager, TokenManager},
    spotify::SpotifyClient,
    types::{SpotifyData, TimeRange},
    utils::{self, GENRE_LIMIT},
};

/// Serves the owner's top items, going to Spotify only when the cached copy
/// is older than the cache window.
#[derive(Debug, Clone)]
pub struct DataService {
    client: SpotifyClient,
    tokens: TokenManager,
    cache: CacheManager,
    ttl: Duration,
}

impl DataService {
    pub fn new(client: SpotifyClient, pool: SqlitePool, config: &Config) -> Self {
        Self {
            client,
            tokens: TokenManager::new(pool.clone(), config.owner_id.clone()),
            cache: CacheManager::new(pool),
            ttl: config.cache_ttl,
        }
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Returns cached data for `range` while it is fresh, otherwise fetches
    /// and caches a new copy.
    ///
    /// A cache hit touches neither the token nor Spotify.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache cannot be read, or any error from
    /// [`refresh`](Self::refresh) on a miss.
    pub async fn load(&self, range: TimeRange) -> Result<SpotifyData> {
        if let Some(cached) = self.cache.latest(range).await? {
            if utils::is_fresh(cached.created_at, utils::now_ms(), self.ttl) {
                debug!(time_range = %range, "Serving cached Spotify data");
                return Ok(cached.into());
            }
        }

        self.refresh(range).await
    }

    /// Fetches from Spotify regardless of the cache and stores the result.
    ///
    /// A failure to write the cache is logged but does not fail the call; the
    /// freshly fetched data is still returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`](crate::Error::Auth) when no token is stored,
    /// and the HTTP or upstream error when refreshing the token or fetching
    /// the top items fails.
    pub async fn refresh(&self, range: TimeRange) -> Result<SpotifyData> {
        let access_token = self.tokens.get_valid_token(&self.client).await?;
        let (artists, tracks) = self.client.top_items(&access_token, range).await?;
        let genres = utils::unique_genres(&artists, GENRE_LIMIT);

        if let Err(e) = self.cache.store(range, &artists, &tracks, &genres).await {
            error!(time_range = %range, "Error storing data: {}", e);
        } else {
            info!(
                time_range = %range,
                artists = artists.len(),
                tracks = tracks.len(),
                "Cached fresh Spotify data"
            );
        }

        Ok(SpotifyData {
            artists,
            tracks,
            genres,
            time_range: range,
        })
    }
}
