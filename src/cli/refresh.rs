use crate::{
    config::Config,
    error,
    management::{DataService, db},
    spotify::SpotifyClient,
    success,
    types::TimeRange,
};

/// Refetches top items for one time range, or all of them, ignoring the
/// cache window.
pub async fn refresh(range: Option<TimeRange>) {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => error!("Cannot load configuration. Err: {}", e),
    };

    let pool = match db::init_database(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => error!("Cannot open database. Err: {}", e),
    };

    let service = DataService::new(SpotifyClient::new(&config), pool, &config);
    let ranges = range.map_or_else(|| TimeRange::ALL.to_vec(), |r| vec![r]);

    for range in ranges {
        let pb = super::spinner(format!("Fetching top items for {}...", range.label()));
        let result = service.refresh(range).await;
        pb.finish_and_clear();

        match result {
            Ok(data) => success!(
                "{}: cached {} artists, {} tracks, {} genres",
                range.label(),
                data.artists.len(),
                data.tracks.len(),
                data.genres.len()
            ),
            Err(e) => error!(
                "Failed to refresh {}. Please run spotfolio auth if the token was revoked.\n Error: {}",
                range,
                e
            ),
        }
    }
}
