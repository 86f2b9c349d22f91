//! Giftswap Admin CLI
//!
//! Organizer tool for setting up and running an exchange against the shared
//! document store.
//!
//! # Usage
//!
//! ```bash
//! giftswap-admin participant add Alice
//! giftswap-admin forbid Alice Bob
//! giftswap-admin start
//! giftswap-admin show
//! giftswap-admin reset --force
//! ```
//!
//! Reads the same config file and `GIFTSWAP_*` environment variables as the
//! participant CLI.

use clap::{Args, Parser, Subcommand, ValueEnum};
use giftswap::{Config, ExchangeDocument, GiftExchange, HttpDocumentStore, Step};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// ============================================================================
// CLI Structure
// ============================================================================

#[derive(Parser)]
#[command(name = "giftswap-admin")]
#[command(version)]
#[command(about = "Giftswap exchange administration tool")]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage participants
    Participant(ParticipantCommand),
    /// Stop a participant from drawing a name
    Forbid {
        /// Participant doing the drawing
        participant: String,
        /// Name they must not draw
        name: String,
    },
    /// Undo a forbid
    Allow {
        participant: String,
        name: String,
    },
    /// Compute eligible names and open the draw
    Start,
    /// Clear all claims, passwords and wish lists
    Reset {
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
    /// Move the exchange to another step
    Step {
        /// setup, selection or wishes
        step: Step,
    },
    /// Show the whole exchange state
    Show {
        #[arg(long, short, value_enum, default_value = "text")]
        format: Format,
    },
}

#[derive(Args)]
struct ParticipantCommand {
    #[command(subcommand)]
    command: ParticipantSubcommand,
}

#[derive(Subcommand)]
enum ParticipantSubcommand {
    /// Add a participant
    Add { name: String },
    /// List participants
    List,
    /// Remove a participant and everything they own
    Remove { name: String },
}

#[derive(Clone, ValueEnum)]
enum Format {
    Text,
    Json,
}

// ============================================================================
// Commands
// ============================================================================

fn connect(config: &Config) -> Result<GiftExchange<HttpDocumentStore>, Box<dyn std::error::Error>> {
    let url = config.store_url.value.as_deref().ok_or(
        "No document store configured. Set store_url in the config file or GIFTSWAP_STORE_URL.",
    )?;
    let store = HttpDocumentStore::with_options(
        url,
        config.api_key.value.as_deref(),
        config.auth_header.value.as_deref(),
        config.request_timeout(),
    )?;
    Ok(GiftExchange::new(store))
}

fn confirm(prompt: &str) -> Result<bool, Box<dyn std::error::Error>> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

fn list_participants(doc: &ExchangeDocument) {
    if doc.names.is_empty() {
        println!("No participants yet.");
        return;
    }

    println!("{:<20} {:<10} {:<10} {:<30}", "NAME", "PICKED", "PASSWORD", "FORBIDDEN");
    println!("{}", "-".repeat(72));

    for name in doc.participants() {
        let picked = if doc.taken.values().any(|by| by == name) {
            "yes"
        } else {
            "no"
        };
        let password = if doc.passwords.contains_key(name) {
            "set"
        } else {
            "-"
        };
        println!(
            "{:<20} {:<10} {:<10} {:<30}",
            name,
            picked,
            password,
            doc.forbidden_for(name).join(", ")
        );
    }

    println!();
    println!("Total: {} participant(s)", doc.names.len());
}

fn show(doc: &ExchangeDocument, format: &Format) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(doc)?),
        Format::Text => {
            let step = doc.step.map(|s| s.to_string());
            println!("Step: {}", step.as_deref().unwrap_or("(not started)"));
            println!();
            list_participants(doc);

            if !doc.taken.is_empty() {
                println!();
                println!("{} of {} name(s) drawn", doc.taken.len(), doc.names.len());
            }

            let wishes: usize = doc.wish_lists.values().map(Vec::len).sum();
            let bought = doc
                .wish_lists
                .values()
                .flatten()
                .filter(|item| item.is_purchased())
                .count();
            println!("Wishes: {} ({} bought)", wishes, bought);
        }
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(cli.config)?;
    let exchange = connect(&config)?;

    match cli.command {
        Commands::Participant(cmd) => match cmd.command {
            ParticipantSubcommand::Add { name } => {
                exchange.add_participant(&name).await?;
                println!("Added participant: {}", name.trim());
            }
            ParticipantSubcommand::List => {
                list_participants(&exchange.document().await?);
            }
            ParticipantSubcommand::Remove { name } => {
                exchange.remove_participant(&name).await?;
                println!("Removed participant: {}", name);
            }
        },
        Commands::Forbid { participant, name } => {
            exchange.forbid(&participant, &name).await?;
            println!("{} can no longer draw {}", participant, name);
        }
        Commands::Allow { participant, name } => {
            exchange.allow(&participant, &name).await?;
            println!("{} may draw {} again", participant, name);
        }
        Commands::Start => {
            let doc = exchange.start().await?;
            println!("Exchange started with {} participant(s).", doc.names.len());
            for name in doc.participants() {
                if doc.eligible_for(name).is_empty() {
                    println!("  Warning: {} has no one left to draw", name);
                }
            }
        }
        Commands::Reset { force } => {
            if !force && !confirm("Reset the exchange? Claims, passwords and wish lists will be lost.")? {
                println!("Reset cancelled.");
                return Ok(());
            }
            exchange.reset().await?;
            println!("Exchange reset.");
        }
        Commands::Step { step } => {
            exchange.set_step(step).await?;
            println!("Step set to {}", step);
        }
        Commands::Show { format } => {
            show(&exchange.document().await?, &format)?;
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
