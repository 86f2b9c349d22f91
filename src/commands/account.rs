use clap::Args;
use serde::Serialize;

use super::{Context, OutputFormat};

#[derive(Args)]
pub struct LoginCommand {
    /// Your name, as entered by the organiser
    pub name: String,

    /// Password. Set on first login; required afterwards once set
    #[arg(long, short)]
    pub password: Option<String>,
}

impl LoginCommand {
    pub async fn run(&self, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
        let login = ctx
            .exchange
            .login(self.name.trim(), self.password.as_deref())
            .await?;
        ctx.sessions.save(&login.session())?;

        println!("Welcome, {}!", login.participant);
        match &login.recipient {
            Some(name) => println!("You are buying a gift for {}.", name),
            None => println!("Next: run `giftswap boxes` and pick a box."),
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct Status<'a> {
    participant: &'a str,
    recipient: Option<&'a str>,
    step: Option<String>,
    next_step: String,
}

#[derive(Args)]
pub struct StatusCommand {
    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl StatusCommand {
    pub async fn run(&self, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
        let login = ctx.current_user().await?;
        let doc = ctx.exchange.document().await?;

        let status = Status {
            participant: &login.participant,
            recipient: login.recipient.as_deref(),
            step: doc.step.map(|s| s.to_string()),
            next_step: login.next_step.to_string(),
        };

        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&status)?);
            }
            OutputFormat::Text => {
                println!("Logged in as: {}", status.participant);
                println!(
                    "Buying for:   {}",
                    status.recipient.unwrap_or("(not picked yet)")
                );
                println!(
                    "Exchange:     {}",
                    status.step.as_deref().unwrap_or("not started")
                );
            }
        }
        Ok(())
    }
}
