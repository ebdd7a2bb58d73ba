use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use spotfolio::{cli, config, types::TimeRange, utils, warning};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the portfolio web server
    Serve,

    /// Authorize with Spotify and store the owner's tokens
    Auth(AuthOptions),

    /// Refetch top items from Spotify, ignoring the cache window
    Refresh(RangeOptions),

    /// Print cached top items
    Show(RangeOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct AuthOptions {
    /// Receive the redirect on a local server instead of pasting the URL
    #[clap(long)]
    pub listen: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct RangeOptions {
    /// Time range (short_term, medium_term, long_term); all when omitted
    #[clap(long, value_parser = utils::parse_time_range)]
    pub time_range: Option<TimeRange>,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        warning!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve().await,
        Command::Auth(opt) => cli::auth(opt.listen).await,
        Command::Refresh(opt) => cli::refresh(opt.time_range).await,
        Command::Show(opt) => cli::show(opt.time_range).await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
