use tabled::Table;

use crate::{
    config, error, info,
    management::{CacheManager, db},
    types::{ArtistTableRow, CachedData, GenreTableRow, TimeRange, TrackTableRow},
    utils, warning,
};

/// Prints the cached top items. Only reads the database, so it works without
/// Spotify credentials.
pub async fn show(range: Option<TimeRange>) {
    let pool = match db::init_database(&config::database_path()).await {
        Ok(pool) => pool,
        Err(e) => error!("Cannot open database. Err: {}", e),
    };
    let cache = CacheManager::new(pool);

    let entries = match range {
        Some(range) => cache.latest(range).await.map(|e| e.into_iter().collect()),
        None => cache.all().await,
    };

    let entries: Vec<CachedData> = match entries {
        Ok(entries) => entries,
        Err(e) => error!("Failed to load cached data. Err: {}", e),
    };

    if entries.is_empty() {
        warning!("No cached data. Run spotfolio refresh.");
        return;
    }

    let now = utils::now_ms();
    for entry in entries {
        info!(
            "{} ({}), cached {} ago",
            entry.time_range.label(),
            entry.time_range,
            utils::format_age(now - entry.created_at)
        );
        print_entry(&entry);
    }
}

fn print_entry(entry: &CachedData) {
    let artists: Vec<ArtistTableRow> = entry
        .artists
        .iter()
        .enumerate()
        .map(|(i, a)| ArtistTableRow {
            rank: i + 1,
            name: a.name.clone(),
            genres: a.genres.iter().take(3).cloned().collect::<Vec<_>>().join(","),
        })
        .collect();

    let tracks: Vec<TrackTableRow> = entry
        .tracks
        .iter()
        .enumerate()
        .map(|(i, t)| TrackTableRow {
            rank: i + 1,
            name: t.name.clone(),
            artists: t.artist_names(),
        })
        .collect();

    let genres: Vec<GenreTableRow> = entry
        .genres
        .iter()
        .enumerate()
        .map(|(i, g)| GenreTableRow {
            rank: i + 1,
            genre: g.clone(),
        })
        .collect();

    println!("{}", Table::new(artists));
    println!("{}", Table::new(tracks));
    println!("{}", Table::new(genres));
}
