use clap::Args;

use super::{Context, OutputFormat};
use giftswap::metadata;

#[derive(Args)]
pub struct PreviewCommand {
    /// Page to look up
    pub url: String,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl PreviewCommand {
    pub async fn run(&self, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
        let task = ctx.metadata.spawn(self.url.clone());
        let abort = task.abort_handle();

        let meta = tokio::select! {
            result = task.join() => match result {
                Some(meta) => meta?,
                None => return Err("Lookup was cancelled".into()),
            },
            _ = tokio::signal::ctrl_c() => {
                abort.abort();
                return Err("Lookup cancelled".into());
            }
        };

        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&meta)?);
            }
            OutputFormat::Text => {
                let field = |label: &str, value: &Option<String>| {
                    if let Some(value) = value {
                        println!("{:<13} {}", label, value);
                    }
                };
                field("Title:", &meta.title);
                field("Site:", &meta.site_name);
                field("Description:", &meta.description);
                field("Price:", &meta.price);
                field("Currency:", &meta.currency);
                field("Availability:", &meta.availability);
                field("Image:", &meta.image);
                field("Type:", &meta.kind);
                if metadata::is_product_url(&self.url) {
                    println!("\nLooks like a product page.");
                }
            }
        }
        Ok(())
    }
}
