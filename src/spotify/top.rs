use serde::de::DeserializeOwned;

use crate::{
    Result,
    spotify::{SpotifyClient, TOP_ARTISTS_LIMIT, TOP_TRACKS_LIMIT, check_status},
    types::{Artist, TimeRange, TopItems, Track},
};

impl SpotifyClient {
    /// Retrieves the owner's top artists for a time range.
    ///
    /// # Arguments
    ///
    /// * `token` - Valid access token with the `user-top-read` scope
    /// * `range` - Window the ranking is computed over
    /// * `limit` - Number of artists to return (1-50)
    pub async fn top_artists(
        &self,
        token: &str,
        range: TimeRange,
        limit: u32,
    ) -> Result<Vec<Artist>> {
        self.top("artists", token, range, limit).await
    }

    /// Retrieves the owner's top tracks for a time range.
    pub async fn top_tracks(&self, token: &str, range: TimeRange, limit: u32) -> Result<Vec<Track>> {
        self.top("tracks", token, range, limit).await
    }

    /// Fetches the top artists and top tracks concurrently.
    ///
    /// Fails as soon as either request fails; there is no partial result.
    pub async fn top_items(&self, token: &str, range: TimeRange) -> Result<(Vec<Artist>, Vec<Track>)> {
        tokio::try_join!(
            self.top_artists(token, range, TOP_ARTISTS_LIMIT),
            self.top_tracks(token, range, TOP_TRACKS_LIMIT),
        )
    }

    async fn top<T: DeserializeOwned>(
        &self,
        kind: &str,
        token: &str,
        range: TimeRange,
        limit: u32,
    ) -> Result<Vec<T>> {
        let api_url = format!(
            "{uri}/me/top/{kind}?limit={limit}&time_range={range}",
            uri = self.api_url,
        );

        let response = self.http.get(&api_url).bearer_auth(token).send().await?;
        let response = check_status(response).await?;
        let page = response.json::<TopItems<T>>().await?;

        Ok(page.items)
    }
}
