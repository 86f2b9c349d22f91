mod document;
mod step;
mod wish;

pub use document::ExchangeDocument;
pub use step::Step;
pub use wish::{Priority, Purchase, UrlMetadata, WishItem};
