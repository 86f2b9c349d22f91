use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{
    BoxesCommand, BuyCommand, ConfigCommand, Context, LoginCommand, PickCommand, PreviewCommand,
    StatusCommand, WishCommand, WishesCommand,
};
use giftswap::Config;

#[derive(Parser)]
#[command(name = "giftswap")]
#[command(version)]
#[command(about = "Pick a secret gift recipient and share wish lists", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in as a participant
    Login(LoginCommand),

    /// Forget the saved login on this machine
    Logout,

    /// Show who you are and who you are buying for
    Status(StatusCommand),

    /// Show the anonymous boxes you can pick from
    Boxes(BoxesCommand),

    /// Open a box and claim the name inside
    Pick(PickCommand),

    /// Manage your wish list
    Wish(WishCommand),

    /// Browse everyone else's wish lists
    Wishes(WishesCommand),

    /// Mark a wish on someone's list as bought (or not)
    Buy(BuyCommand),

    /// Look up page details for a link
    Preview(PreviewCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        Some(Commands::Logout) => {
            giftswap::SessionStore::new(&config.data_dir.value).clear()?;
            println!("Logged out");
        }
        Some(Commands::Login(cmd)) => cmd.run(&Context::new(&config)?).await?,
        Some(Commands::Status(cmd)) => cmd.run(&Context::new(&config)?).await?,
        Some(Commands::Boxes(cmd)) => cmd.run(&Context::new(&config)?).await?,
        Some(Commands::Pick(cmd)) => cmd.run(&Context::new(&config)?).await?,
        Some(Commands::Wish(cmd)) => cmd.run(&Context::new(&config)?).await?,
        Some(Commands::Wishes(cmd)) => cmd.run(&Context::new(&config)?).await?,
        Some(Commands::Buy(cmd)) => cmd.run(&Context::new(&config)?).await?,
        Some(Commands::Preview(cmd)) => cmd.run(&Context::new(&config)?).await?,
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
