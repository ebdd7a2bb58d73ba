use std::{
    collections::HashSet,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
    time::Duration,
};

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use rand::{Rng, distr::Alphanumeric};
use reqwest::Url;

use crate::{
    Error, Result,
    types::{Artist, SocialLink, TimeRange},
};

/// Maximum number of genres shown on the page.
pub const GENRE_LIMIT: usize = 6;

pub fn generate_state() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

/// `Authorization` header value for client-credential authentication against
/// the token endpoint.
pub fn basic_auth_value(client_id: &str, client_secret: &str) -> String {
    format!(
        "Basic {}",
        STANDARD.encode(format!("{client_id}:{client_secret}"))
    )
}

/// Flattens the artists' genres in order, keeping the first occurrence of each
/// genre, and caps the result at `limit`.
pub fn unique_genres(artists: &[Artist], limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    artists
        .iter()
        .flat_map(|artist| artist.genres.iter())
        .filter(|genre| seen.insert(genre.as_str()))
        .take(limit)
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Extracts the OAuth parameters from a pasted redirect URL.
pub fn parse_callback_url(raw: &str) -> Result<CallbackParams> {
    let url = Url::parse(raw.trim())
        .map_err(|e| Error::Auth(format!("Invalid callback URL '{}': {e}", raw.trim())))?;

    let mut params = CallbackParams {
        code: None,
        state: None,
        error: None,
    };
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => params.code = Some(value.into_owned()),
            "state" => params.state = Some(value.into_owned()),
            "error" => params.error = Some(value.into_owned()),
            _ => {}
        }
    }
    Ok(params)
}

/// Checks a callback against the state sent with the authorize request and
/// returns the authorization code.
///
/// The code is checked before the state, so a redirect without any
/// parameters reports the missing code.
pub fn verify_callback(params: &CallbackParams, expected_state: &str) -> Result<String> {
    if let Some(err) = &params.error {
        return Err(Error::Auth(format!("Authorization denied: {err}")));
    }

    let Some(code) = params.code.clone() else {
        return Err(Error::Auth("No code found in callback URL".to_string()));
    };

    let returned_state = params.state.as_deref().unwrap_or_default();
    if returned_state != expected_state {
        return Err(Error::Auth(format!(
            "State mismatch. Expected: {expected_state} Got: {returned_state}"
        )));
    }

    Ok(code)
}

/// Local addresses to listen on for the redirect, taken from the host and
/// port of the registered redirect URI.
///
/// `localhost` maps to both loopback addresses since browsers differ in which
/// one they try first. Any other host name falls back to the IPv4 loopback.
pub fn callback_bind_addrs(redirect_uri: &str) -> Result<Vec<SocketAddr>> {
    let url = Url::parse(redirect_uri)
        .map_err(|e| Error::Config(format!("Invalid redirect URI '{redirect_uri}': {e}")))?;
    let port = url.port_or_known_default().ok_or_else(|| {
        Error::Config(format!("Redirect URI '{redirect_uri}' has no port"))
    })?;

    let host = url
        .host_str()
        .unwrap_or_default()
        .trim_start_matches('[')
        .trim_end_matches(']');

    let addrs = match host.parse::<IpAddr>() {
        Ok(ip) => vec![SocketAddr::new(ip, port)],
        Err(_) if host.eq_ignore_ascii_case("localhost") => vec![
            SocketAddr::from((Ipv4Addr::LOCALHOST, port)),
            SocketAddr::from((Ipv6Addr::LOCALHOST, port)),
        ],
        Err(_) => vec![SocketAddr::from((Ipv4Addr::LOCALHOST, port))],
    };
    Ok(addrs)
}

/// Parses `SITE_SOCIAL_LINKS`, a comma separated list of `platform=url`
/// pairs such as `youtube=https://www.youtube.com/@me,tiktok=https://...`.
///
/// Order is kept. Blank entries are skipped.
///
/// # Errors
///
/// Returns [`Error::Config`] for an entry without `=`, an empty platform, or
/// a URL that is not absolute `http`/`https`.
pub fn parse_social_links(raw: &str) -> Result<Vec<SocialLink>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (platform, url) = entry.split_once('=').ok_or_else(|| {
                Error::Config(format!("Social link '{entry}' must look like platform=url"))
            })?;
            let (platform, url) = (platform.trim(), url.trim());
            if platform.is_empty() {
                return Err(Error::Config(format!("Social link '{entry}' has no platform")));
            }

            match Url::parse(url) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(SocialLink {
                    platform: platform.to_string(),
                    url: url.to_string(),
                }),
                _ => Err(Error::Config(format!(
                    "Social link for {platform} is not an http(s) URL: '{url}'"
                ))),
            }
        })
        .collect()
}

pub fn parse_time_range(raw: &str) -> std::result::Result<TimeRange, String> {
    raw.parse::<TimeRange>().map_err(|e| e.to_string())
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Expiry timestamp in epoch milliseconds for a token valid `expires_in`
/// seconds from `now`.
pub fn expires_at(now: i64, expires_in: u64) -> i64 {
    let lifetime_ms = i64::try_from(expires_in)
        .unwrap_or(i64::MAX)
        .saturating_mul(1000);
    now.saturating_add(lifetime_ms)
}

/// Whether a cache entry created at `created_at` is still within `ttl` at
/// `now`. All timestamps are epoch milliseconds.
pub fn is_fresh(created_at: i64, now: i64, ttl: Duration) -> bool {
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    now.saturating_sub(created_at) < ttl_ms
}

/// Human readable age, e.g. `42s`, `17m`, `3h 5m`.
pub fn format_age(age_ms: i64) -> String {
    let secs = age_ms.max(0) / 1000;
    match secs {
        s if s < 60 => format!("{s}s"),
        s if s < 3600 => format!("{}m", s / 60),
        s => format!("{}h {}m", s / 3600, (s % 3600) / 60),
    }
}
