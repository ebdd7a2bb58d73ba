//! # CLI Module
//!
//! User-facing commands of the `spotfolio` binary.
//!
//! ## Commands
//!
//! - [`serve`] - Runs the portfolio web server
//! - [`auth`] - One-time OAuth authorization-code exchange; stores the
//!   owner's tokens in the database
//! - [`refresh`] - Refetches top items from Spotify, bypassing the cache window
//! - [`show`] - Prints the cached top items as tables
//!
//! ## Usage Patterns
//!
//! ```bash
//! spotfolio auth                         # paste the redirect URL when asked
//! spotfolio auth --listen                # or let a local server catch it
//! spotfolio refresh                      # warm the cache for all time ranges
//! spotfolio show --time-range short_term
//! spotfolio serve
//! ```
//!
//! Commands report through the `info!`, `success!`, `warning!` and `error!`
//! macros; `error!` terminates the process with exit code 1.

mod auth;
mod refresh;
mod serve;
mod show;

pub use auth::auth;
pub use refresh::refresh;
pub use serve::serve;
pub use show::show;

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb
}
