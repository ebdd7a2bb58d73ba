//! Database initialization

use std::path::Path;

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::info;

use crate::Result;

/// Opens (creating if needed) the database file and ensures the schema exists.
///
/// Missing parent directories are created first.
///
/// # Errors
///
/// Returns [`Error::Io`](crate::Error::Io) if the parent directory cannot be
/// created, and [`Error::Database`](crate::Error::Database) if the file cannot
/// be opened or the schema cannot be applied.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            async_fs::create_dir_all(parent).await?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;
    Ok(pool)
}

/// In-memory database with the schema applied.
///
/// Limited to a single connection that is never recycled; every connection to
/// `sqlite::memory:` would otherwise see its own empty database.
///
/// # Errors
///
/// Returns [`Error::Database`](crate::Error::Database) if the connection or
/// the schema fails.
pub async fn init_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    create_schema(&pool).await?;
    Ok(pool)
}

async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS spotify_tokens (
            user_id TEXT PRIMARY KEY,
            access_token TEXT NOT NULL,
            refresh_token TEXT NOT NULL,
            expires_at INTEGER NOT NULL,
            last_updated TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // JSON columns hold the serialized artist, track and genre lists
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS spotify_data (
            time_range TEXT PRIMARY KEY,
            artists TEXT NOT NULL,
            tracks TEXT NOT NULL,
            genres TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
