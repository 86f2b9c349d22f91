mod account;
mod config_cmd;
mod pick;
mod preview;
mod wish;

pub use account::{LoginCommand, StatusCommand};
pub use config_cmd::ConfigCommand;
pub use pick::{BoxesCommand, PickCommand};
pub use preview::PreviewCommand;
pub use wish::{BuyCommand, WishCommand, WishesCommand};

use clap::ValueEnum;
use giftswap::{
    Config, GiftExchange, HttpDocumentStore, Login, MetadataFetcher, SessionStore,
};

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Everything a participant command needs: the exchange and the saved session.
pub struct Context {
    pub exchange: GiftExchange<HttpDocumentStore>,
    pub metadata: MetadataFetcher,
    pub sessions: SessionStore,
}

impl Context {
    pub fn new(config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        let url = config.store_url.value.as_deref().ok_or(
            "No document store configured. Set store_url in the config file or GIFTSWAP_STORE_URL.",
        )?;

        let store = HttpDocumentStore::with_options(
            url,
            config.api_key.value.as_deref(),
            config.auth_header.value.as_deref(),
            config.request_timeout(),
        )?;
        let metadata = MetadataFetcher::new(config.metadata_options())?;

        Ok(Self {
            exchange: GiftExchange::new(store).with_metadata(metadata.clone()),
            metadata,
            sessions: SessionStore::new(&config.data_dir.value),
        })
    }

    /// The participant logged in on this machine.
    pub async fn current_user(&self) -> Result<Login, Box<dyn std::error::Error>> {
        let session = self
            .sessions
            .load()?
            .ok_or("Not logged in. Run `giftswap login <NAME>` first.")?;

        match self.exchange.restore(&session).await? {
            Some(login) => Ok(login),
            None => {
                self.sessions.clear()?;
                Err(format!(
                    "Session for {} is no longer valid. Please log in again.",
                    session.participant
                )
                .into())
            }
        }
    }
}
