//! Spotify Portfolio Library
//!
//! This library powers a small personal portfolio site that shows the owner's
//! top Spotify artists, tracks and genres. A single JSON endpoint serves the
//! data, refreshing it from the Spotify Web API at most once per cache window
//! and keeping the results in a SQLite table. A one-shot CLI command performs
//! the OAuth authorization-code exchange and stores the owner's tokens.
//!
//! # Modules
//!
//! - `api` - HTTP handlers for the portfolio page, data endpoint and callbacks
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration management and environment variables
//! - `error` - Crate error type
//! - `management` - Token and cache persistence on top of SQLite
//! - `server` - Router construction and HTTP server startup
//! - `spotify` - Spotify Web API client implementation
//! - `types` - Data structures and type definitions
//! - `utils` - Utility functions and helpers

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod management;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;

pub use error::{Error, Result};

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```
/// info!("Starting authentication process...");
/// info!("Found {} artists", count);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only use this for fatal errors in CLI commands. Server code logs through
/// `tracing` and returns an error status instead.
///
/// # Example
///
/// ```
/// error!("Missing Spotify credentials");
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
