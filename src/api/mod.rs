//! # API Module
//!
//! HTTP handlers for the portfolio site.
//!
//! ## Endpoints
//!
//! - [`index`] - `GET /`, the portfolio page itself. It polls the data
//!   endpoint whenever the selected time range changes.
//! - [`spotify_data`] - `GET /api/spotify/data?timeRange=<range>`, the owner's
//!   top artists, tracks and genres for a time range.
//! - [`health`] - `GET /health`, status, version and the age of each cached range.
//! - [`callback`] - `GET /callback`, mounted only while `spotfolio auth
//!   --listen` waits for Spotify to redirect back.
//!
//! Handler failures are logged and mapped to a JSON `{ "error": ... }` body
//! through [`ApiError`].

mod callback;
mod data;
mod health;
mod page;

pub use callback::{CallbackState, callback};
pub use data::{ApiError, spotify_data};
pub use health::health;
pub use page::{index, render_index};
