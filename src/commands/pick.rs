use clap::Args;

use super::{Context, OutputFormat};

#[derive(Args)]
pub struct BoxesCommand {
    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl BoxesCommand {
    pub async fn run(&self, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
        let login = ctx.current_user().await?;
        let boxes = ctx.exchange.boxes(&login.participant).await?;

        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&boxes)?);
            }
            OutputFormat::Text => {
                if let Some(name) = &login.recipient {
                    println!("You already picked {}.", name);
                    return Ok(());
                }
                if boxes.is_empty() {
                    println!("No boxes to pick from yet");
                    return Ok(());
                }

                println!("{:<4}  {:<8}  {:<9}  STATUS", "BOX", "COLOR", "ICON");
                println!("{}", "-".repeat(36));
                for b in &boxes {
                    let status = if b.taken { "taken" } else { "available" };
                    println!("{:<4}  {:<8}  {:<9}  {}", b.number, b.color, b.icon, status);
                }
                let open = boxes.iter().filter(|b| !b.taken).count();
                println!("\n{} of {} box(es) still closed", open, boxes.len());
            }
        }
        Ok(())
    }
}

#[derive(Args)]
pub struct PickCommand {
    /// Box number from `giftswap boxes`
    pub number: usize,
}

impl PickCommand {
    pub async fn run(&self, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
        let login = ctx.current_user().await?;
        let name = ctx.exchange.pick_box(&login.participant, self.number).await?;

        println!("You opened box {}...", self.number);
        println!("You are buying a gift for {}!", name);
        Ok(())
    }
}
