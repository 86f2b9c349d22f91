//! Giftswap
//!
//! A gift exchange kept in one shared JSON document: participants pick a
//! recipient from anonymous boxes, keep wish lists, and mark gifts on other
//! lists as bought.

pub mod assignment;
pub mod config;
pub mod error;
pub mod exchange;
pub mod hasher;
pub mod metadata;
pub mod models;
pub mod server;
pub mod session;
pub mod store;
pub mod wishlist;

pub use assignment::{AnonymousBox, ClaimError};
pub use config::{Config, ConfigError, ConfigSource, ConfigValue};
pub use error::{Error, RosterError};
pub use exchange::{GiftExchange, Login};
pub use metadata::{MetadataError, MetadataFetcher, MetadataOptions};
pub use models::{ExchangeDocument, Priority, Purchase, Step, UrlMetadata, WishItem};
pub use session::{Session, SessionError, SessionStore};
pub use store::{DocumentStore, HttpDocumentStore, MemoryDocumentStore, StoreError};
pub use wishlist::{WishDraft, WishError, WishPatch};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
