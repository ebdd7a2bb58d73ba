use std::{collections::HashMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::Error;

/// Window over which Spotify computes "top items".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    ShortTerm,
    #[default]
    MediumTerm,
    LongTerm,
}

impl TimeRange {
    pub const ALL: [TimeRange; 3] = [
        TimeRange::ShortTerm,
        TimeRange::MediumTerm,
        TimeRange::LongTerm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "short_term",
            TimeRange::MediumTerm => "medium_term",
            TimeRange::LongTerm => "long_term",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "LAST 4 WEEKS",
            TimeRange::MediumTerm => "LAST 6 MONTHS",
            TimeRange::LongTerm => "ALL TIME",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short_term" => Ok(TimeRange::ShortTerm),
            "medium_term" => Ok(TimeRange::MediumTerm),
            "long_term" => Ok(TimeRange::LongTerm),
            other => Err(Error::InvalidTimeRange(other.to_string())),
        }
    }
}

/// Body returned by the token endpoint for both code exchange and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    pub expires_in: u64,
    /// Absent on most refresh responses.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredToken {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Epoch milliseconds.
    pub expires_at: i64,
}

impl StoredToken {
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct PendingAuth {
    pub state: String,
    pub token: Option<TokenResponse>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub external_urls: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackArtist {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<TrackArtist>,
    pub album: Album,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub external_urls: HashMap<String, String>,
}

impl Track {
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Paging envelope of `/me/top/{type}`; only `items` is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopItems<T> {
    pub items: Vec<T>,
}

/// Payload served by `/api/spotify/data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotifyData {
    pub artists: Vec<Artist>,
    pub tracks: Vec<Track>,
    pub genres: Vec<String>,
    #[serde(rename = "timeRange")]
    pub time_range: TimeRange,
}

/// One row of `spotify_data`.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedData {
    pub time_range: TimeRange,
    pub artists: Vec<Artist>,
    pub tracks: Vec<Track>,
    pub genres: Vec<String>,
    /// Epoch milliseconds.
    pub created_at: i64,
}

impl From<CachedData> for SpotifyData {
    fn from(cached: CachedData) -> Self {
        SpotifyData {
            artists: cached.artists,
            tracks: cached.tracks,
            genres: cached.genres,
            time_range: cached.time_range,
        }
    }
}

/// A profile link shown under the owner's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocialLink {
    /// Short platform name, e.g. `youtube`, used as the link label.
    pub platform: String,
    pub url: String,
}

/// Everything about the owner that the page renders besides Spotify data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteProfile {
    pub owner_name: Option<String>,
    pub photo_url: Option<String>,
    pub snapcode_url: Option<String>,
    pub social_links: Vec<SocialLink>,
}

#[derive(Tabled)]
pub struct ArtistTableRow {
    pub rank: usize,
    pub name: String,
    pub genres: String,
}

#[derive(Tabled)]
pub struct TrackTableRow {
    pub rank: usize,
    pub name: String,
    pub artists: String,
}

#[derive(Tabled)]
pub struct GenreTableRow {
    pub rank: usize,
    pub genre: String,
}
