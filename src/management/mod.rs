//! # Management Module
//!
//! Persistence for the two pieces of state the site keeps: the owner's OAuth
//! tokens and the cached top items per time range. Both live in SQLite and
//! are accessed through small managers bound to a shared pool.
//!
//! [`DataService`] ties the managers to the Spotify client and implements the
//! data endpoint: serve from cache while fresh, otherwise refresh the token if
//! needed, fetch, store and return.

mod cache;
mod data;
pub mod db;
mod token;

pub use cache::CacheManager;
pub use data::DataService;
pub use token::TokenManager;
