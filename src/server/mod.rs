//! Server-side modules for the giftswap document-store server.

pub mod routes;
pub mod storage;

pub use routes::{router, ApiError, ApiKeys, AppState, ClientLabel};
pub use storage::FileDocumentStore;
