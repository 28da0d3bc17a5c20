use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use podium_core::{Manager, ManagerConfig, Player, SortOrder, ToggleConnectivity};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod shutdown;

#[derive(Parser)]
#[command(name = "podium")]
#[command(about = "Offline-first leaderboard and achievement tracker")]
struct Args {
    /// Directory for cached player state
    #[arg(long, env = "PODIUM_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Player id to file saves under; omit to queue as an unknown player
    #[arg(long, env = "PODIUM_PLAYER")]
    player: Option<String>,

    /// Display name shown alongside the player id
    #[arg(long)]
    display_name: Option<String>,

    /// Remote platform endpoint; omit to run fully offline
    #[arg(long, env = "PODIUM_API_ENDPOINT")]
    endpoint: Option<String>,

    /// Bearer token for the remote endpoint
    #[arg(long, env = "PODIUM_API_TOKEN")]
    token: Option<String>,

    /// Queue every write without attempting the network
    #[arg(long)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show cached bests, progress, and queue depth
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Record a leaderboard score
    Score {
        leaderboard: String,
        value: i64,
        #[arg(long, default_value = "high-to-low")]
        sort: SortOrder,
    },
    /// Report achievement progress
    Achievement {
        achievement: String,
        percent: f64,
        /// Ask the platform to show its completion banner
        #[arg(long)]
        banner: bool,
    },
    /// Replay the pending queue
    Flush {
        /// Keep flushing until Ctrl-C
        #[arg(long)]
        watch: bool,

        /// Seconds between passes in watch mode
        #[arg(long, default_value_t = 30)]
        interval: u64,
    },
    /// Pull remote state, merge it, then flush
    Sync,
    /// List open challenges
    Challenges,
    /// Save the player's profile photo to a file
    Photo {
        /// Where to write the image
        #[arg(long, default_value = "player-photo.png")]
        out: PathBuf,
    },
    /// Wipe achievement progress, remotely and locally
    Reset {
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("podium_core=info".parse()?)
                .add_directive("podium_cli=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let manager = build_manager(&args)?;

    match args.command {
        Command::Status { json } => commands::status::run(&manager, json),
        Command::Score {
            leaderboard,
            value,
            sort,
        } => commands::submit::score(&manager, &leaderboard, value, sort),
        Command::Achievement {
            achievement,
            percent,
            banner,
        } => commands::submit::achievement(&manager, &achievement, percent, banner),
        Command::Flush { watch, interval } => commands::flush::run(&manager, watch, interval),
        Command::Sync => commands::sync::run(&manager),
        Command::Challenges => commands::challenges::run(&manager),
        Command::Photo { out } => commands::photo::run(&manager, &out),
        Command::Reset { yes } => commands::reset::run(&manager, yes),
    }
}

fn build_manager(args: &Args) -> Result<Manager> {
    let data_dir = match &args.data_dir {
        Some(dir) => dir.clone(),
        None => dirs::data_dir()
            .context("could not determine a data directory; pass --data-dir")?
            .join("podium"),
    };
    debug!(dir = %data_dir.display(), "using data directory");

    let mut config = ManagerConfig::new().with_data_dir(&data_dir);

    if let Some(id) = &args.player {
        let player = match &args.display_name {
            Some(name) => Player::with_display_name(id, name),
            None => Player::new(id),
        };
        config = config.with_player(player);
    }

    match &args.endpoint {
        Some(endpoint) if !args.offline => {
            info!(endpoint, "submitting through remote endpoint");
            config = config.with_endpoint(endpoint, args.token.as_deref());
        }
        _ => {
            // No endpoint (or --offline): report the link as down so every
            // write parks quietly instead of failing an attempt first.
            debug!("running without a remote endpoint, queueing only");
            config = config.with_connectivity(Arc::new(ToggleConnectivity::new(false)));
        }
    }

    Ok(Manager::new(config))
}
