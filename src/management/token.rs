use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::{
    Error, Result,
    spotify::SpotifyClient,
    types::{StoredToken, TokenResponse},
    utils,
};

/// Reads and writes the owner's row in `spotify_tokens`.
#[derive(Debug, Clone)]
pub struct TokenManager {
    pool: SqlitePool,
    user_id: String,
}

impl TokenManager {
    pub fn new(pool: SqlitePool, user_id: impl Into<String>) -> Self {
        TokenManager {
            pool,
            user_id: user_id.into(),
        }
    }

    /// Loads the stored token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] when no token has been stored yet, which means
    /// the `auth` command has never been run for this owner.
    pub async fn load(&self) -> Result<StoredToken> {
        let row = sqlx::query_as::<_, (String, String, String, i64)>(
            "SELECT user_id, access_token, refresh_token, expires_at FROM spotify_tokens WHERE user_id = ?",
        )
        .bind(&self.user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((user_id, access_token, refresh_token, expires_at)) = row else {
            return Err(Error::Auth("Failed to get token".to_string()));
        };

        Ok(StoredToken {
            user_id,
            access_token,
            refresh_token,
            expires_at,
        })
    }

    /// Stores the result of an authorization-code exchange, replacing any
    /// previous row for the owner.
    ///
    /// The expiry is computed from `expires_in` relative to now and kept in
    /// epoch milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if the response carries no refresh token and
    /// [`Error::Database`] if the write fails.
    pub async fn store(&self, token: &TokenResponse) -> Result<StoredToken> {
        let refresh_token = token.refresh_token.clone().ok_or_else(|| {
            Error::Auth("Token response did not include a refresh token".to_string())
        })?;
        let expires_at = utils::expires_at(utils::now_ms(), token.expires_in);

        sqlx::query(
            r#"
            INSERT INTO spotify_tokens (user_id, access_token, refresh_token, expires_at, last_updated)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                expires_at = excluded.expires_at,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(&self.user_id)
        .bind(&token.access_token)
        .bind(&refresh_token)
        .bind(expires_at)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(StoredToken {
            user_id: self.user_id.clone(),
            access_token: token.access_token.clone(),
            refresh_token,
            expires_at,
        })
    }

    /// Persists a refreshed access token. The refresh token is only replaced
    /// when Spotify rotated it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if there is no row for the owner to update and
    /// [`Error::Database`] if the write fails.
    pub async fn update_access_token(&self, token: &TokenResponse) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE spotify_tokens
            SET access_token = ?,
                refresh_token = COALESCE(?, refresh_token),
                expires_at = ?,
                last_updated = ?
            WHERE user_id = ?
            "#,
        )
        .bind(&token.access_token)
        .bind(token.refresh_token.as_deref())
        .bind(utils::expires_at(utils::now_ms(), token.expires_in))
        .bind(Utc::now().to_rfc3339())
        .bind(&self.user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::Auth("Failed to get token".to_string()));
        }
        Ok(())
    }

    /// Returns an access token that has not expired, refreshing and
    /// persisting it first when needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] when no token is stored, and whatever the token
    /// endpoint or the database reports when a refresh is needed and fails.
    pub async fn get_valid_token(&self, client: &SpotifyClient) -> Result<String> {
        let stored = self.load().await?;

        if !stored.is_expired(utils::now_ms()) {
            return Ok(stored.access_token);
        }

        info!(user_id = %self.user_id, "Access token expired, refreshing");
        let refreshed = client.refresh_access_token(&stored.refresh_token).await?;
        self.update_access_token(&refreshed).await?;

        Ok(refreshed.access_token)
    }
}
