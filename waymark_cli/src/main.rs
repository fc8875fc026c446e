use clap::{Parser, Subcommand};
use tracing::debug;

use crate::{replay::ReplayArgs, route::RouteArgs};

mod parsers;
mod replay;
mod route;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a single driving route between two coordinates
    #[command(visible_alias = "r")]
    Route {
        #[command(flatten)]
        args: RouteArgs,
    },
    /// Feed a recorded event log through a map session
    Replay {
        #[command(flatten)]
        args: ReplayArgs,
    },
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::from_filename("./.env.local").ok();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    match cli.command {
        Some(Commands::Route { args }) => route::run(args).await?,
        Some(Commands::Replay { args }) => replay::run(args).await?,
        None => {
            debug!("No command given");
        }
    }

    Ok(())
}
