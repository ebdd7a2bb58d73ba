use sqlx::SqlitePool;

use crate::{
    Result,
    types::{Artist, CachedData, TimeRange, Track},
    utils,
};

type CacheRow = (String, String, String, String, i64);

/// One cached payload per time range, stored in `spotify_data`.
#[derive(Debug, Clone)]
pub struct CacheManager {
    pool: SqlitePool,
}

impl CacheManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Most recent entry for `range`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Database`](crate::Error::Database) if the query fails
    /// and [`Error::Json`](crate::Error::Json) if a stored payload no longer
    /// decodes.
    pub async fn latest(&self, range: TimeRange) -> Result<Option<CachedData>> {
        let row = sqlx::query_as::<_, CacheRow>(
            r#"
            SELECT time_range, artists, tracks, genres, created_at
            FROM spotify_data
            WHERE time_range = ?
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(range.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(decode_row).transpose()
    }

    /// Replaces the entry for `range`, stamping it with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the items cannot be
    /// encoded and [`Error::Database`](crate::Error::Database) if the write
    /// fails.
    pub async fn store(
        &self,
        range: TimeRange,
        artists: &[Artist],
        tracks: &[Track],
        genres: &[String],
    ) -> Result<CachedData> {
        let created_at = utils::now_ms();

        sqlx::query(
            r#"
            INSERT INTO spotify_data (time_range, artists, tracks, genres, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(time_range) DO UPDATE SET
                artists = excluded.artists,
                tracks = excluded.tracks,
                genres = excluded.genres,
                created_at = excluded.created_at
            "#,
        )
        .bind(range.as_str())
        .bind(serde_json::to_string(artists)?)
        .bind(serde_json::to_string(tracks)?)
        .bind(serde_json::to_string(genres)?)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(CachedData {
            time_range: range,
            artists: artists.to_vec(),
            tracks: tracks.to_vec(),
            genres: genres.to_vec(),
            created_at,
        })
    }

    /// Every cached entry, in short, medium, long order.
    ///
    /// # Errors
    ///
    /// Fails on the first range that [`latest`](Self::latest) fails for.
    pub async fn all(&self) -> Result<Vec<CachedData>> {
        let mut entries = Vec::new();
        for range in TimeRange::ALL {
            if let Some(entry) = self.latest(range).await? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}

fn decode_row((time_range, artists, tracks, genres, created_at): CacheRow) -> Result<CachedData> {
    Ok(CachedData {
        time_range: time_range.parse()?,
        artists: serde_json::from_str(&artists)?,
        tracks: serde_json::from_str(&tracks)?,
        genres: serde_json::from_str(&genres)?,
        created_at,
    })
}
