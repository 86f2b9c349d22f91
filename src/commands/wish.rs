use clap::{Args, Subcommand};
use std::io::{self, Write};

use super::{Context, OutputFormat};
use giftswap::{Priority, WishDraft, WishItem, WishPatch};

#[derive(Args)]
pub struct WishCommand {
    #[command(subcommand)]
    pub command: WishSubcommand,
}

#[derive(Subcommand)]
pub enum WishSubcommand {
    /// Add a wish to your list
    Add {
        /// What you would like
        description: String,

        /// Link to the item
        #[arg(long)]
        url: Option<String>,

        /// low, medium or high
        #[arg(long, short, default_value = "medium")]
        priority: Priority,
    },

    /// Show your wish list
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Change a wish on your list
    Edit {
        /// Wish ID
        id: String,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// New link
        #[arg(long, conflicts_with = "clear_url")]
        url: Option<String>,

        /// Remove the link
        #[arg(long)]
        clear_url: bool,

        /// New priority
        #[arg(long, short)]
        priority: Option<Priority>,
    },

    /// Remove a wish from your list
    Remove {
        /// Wish ID
        id: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl WishCommand {
    pub async fn run(&self, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
        let login = ctx.current_user().await?;
        let me = login.participant.as_str();

        match &self.command {
            WishSubcommand::Add {
                description,
                url,
                priority,
            } => {
                let draft = WishDraft {
                    url: url.clone(),
                    priority: *priority,
                    ..WishDraft::new(description.clone())
                };

                let added = ctx.exchange.add_wish(me, draft).await?;
                println!("Added wish:");
                println!("  {}", added);
                println!("  id: {}", added.id);
                Ok(())
            }

            WishSubcommand::List { format } => {
                let list = ctx.exchange.wish_list(me).await?;
                match format {
                    OutputFormat::Json => {
                        // Hide who bought what on your own list.
                        let hidden: Vec<WishItem> = list
                            .into_iter()
                            .map(|mut item| {
                                item.purchase = None;
                                item
                            })
                            .collect();
                        println!("{}", serde_json::to_string_pretty(&hidden)?);
                    }
                    OutputFormat::Text => {
                        if list.is_empty() {
                            println!("Your wish list is empty");
                            return Ok(());
                        }
                        print_list(&list, false);
                    }
                }
                Ok(())
            }

            WishSubcommand::Edit {
                id,
                description,
                url,
                clear_url,
                priority,
            } => {
                let url = if *clear_url {
                    Some(None)
                } else {
                    url.clone().map(Some)
                };
                let patch = WishPatch {
                    description: description.clone(),
                    url,
                    priority: *priority,
                    metadata: None,
                };
                if patch == WishPatch::default() {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let updated = ctx.exchange.update_wish(me, id, patch).await?;
                println!("Updated wish:");
                println!("  {}", updated);
                Ok(())
            }

            WishSubcommand::Remove { id, force } => {
                if !force {
                    print!("Remove wish '{}'? [y/N] ", id);
                    io::stdout().flush()?;

                    let mut input = String::new();
                    io::stdin().read_line(&mut input)?;

                    if !input.trim().eq_ignore_ascii_case("y") {
                        println!("Removal cancelled.");
                        return Ok(());
                    }
                }

                let removed = ctx.exchange.remove_wish(me, id).await?;
                println!("Removed wish: {}", removed.description);
                Ok(())
            }
        }
    }
}

#[derive(Args)]
pub struct WishesCommand {
    /// Only show this participant's list
    #[arg(long = "for", value_name = "NAME")]
    pub owner: Option<String>,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl WishesCommand {
    pub async fn run(&self, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
        let login = ctx.current_user().await?;
        let mut lists = ctx.exchange.all_wish_lists(&login.participant).await?;

        if let Some(owner) = &self.owner {
            lists.retain(|name, _| name == owner);
            if lists.is_empty() {
                return Err(format!("No wish list for '{}'", owner).into());
            }
        }

        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&lists)?);
            }
            OutputFormat::Text => {
                for (name, list) in &lists {
                    let marker = if login.recipient.as_deref() == Some(name.as_str()) {
                        "  (your recipient)"
                    } else {
                        ""
                    };
                    println!("{}{}", name, marker);
                    println!("{}", "=".repeat(name.len() + marker.len()));
                    if list.is_empty() {
                        println!("  (no wishes yet)");
                    } else {
                        print_list(list, true);
                    }
                    println!();
                }
            }
        }
        Ok(())
    }
}

#[derive(Args)]
pub struct BuyCommand {
    /// Whose list the wish is on
    pub owner: String,

    /// Wish ID
    pub id: String,
}

impl BuyCommand {
    pub async fn run(&self, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
        let login = ctx.current_user().await?;
        let item = ctx
            .exchange
            .toggle_purchased(&self.owner, &self.id, &login.participant)
            .await?;

        if item.is_purchased() {
            println!("Marked '{}' as bought.", item.description);
        } else {
            println!("'{}' is no longer marked as bought.", item.description);
        }
        Ok(())
    }
}

fn print_list(list: &[WishItem], show_purchases: bool) {
    println!("{:<36}  {:<6}  WISH", "ID", "PRIO");
    println!("{}", "-".repeat(80));
    for item in list {
        let mut line = item.description.clone();
        if let Some(price) = item.metadata.as_ref().and_then(|m| m.price.as_deref()) {
            line.push_str(&format!(" ({})", price));
        }
        if show_purchases {
            if let Some(by) = item.purchased_by() {
                line.push_str(&format!(" - bought by {}", by));
            }
        }
        println!("{:<36}  {:<6}  {}", item.id, item.priority.to_string(), line);
        if let Some(url) = &item.url {
            println!("{:<36}  {:<6}  {}", "", "", url);
        }
    }
    println!("\nTotal: {} wish(es)", list.len());
}
