//! Giftswap document server
//!
//! Holds the shared exchange document and serves it over the same GET/PUT
//! protocol the participant CLI uses for any JSON document store. Writes
//! carrying `If-Match` are only applied to the version they were based on.
//!
//! # Configuration
//!
//! Environment variables:
//! - `GIFTSWAP_PORT`: Port to listen on (default: 8080)
//! - `GIFTSWAP_DATA_DIR`: Directory holding `exchange.json` (default: ~/.local/share/giftswap-server)
//! - `GIFTSWAP_CONFIG`: Path to config file (default: ~/.config/giftswap-server/config.yaml)
//!
//! # Config File Format
//!
//! ```yaml
//! api_keys:
//!   - key: "your-secret-key-here"
//!     label: "family"
//! ```
//!
//! # Endpoints
//!
//! - `GET /health`: Health check endpoint (no auth required)
//! - `GET /document`: Current document (auth required)
//! - `PUT /document`: Replace the document (auth required)

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use giftswap::server::{router, ApiKeys, AppState, FileDocumentStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Server configuration
#[derive(Debug, Clone)]
struct Config {
    /// Port to listen on
    port: u16,
    /// Directory holding the document file
    data_dir: PathBuf,
    /// Path to config file
    config_path: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        let port = std::env::var("GIFTSWAP_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let data_dir = std::env::var("GIFTSWAP_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("giftswap-server")
            });

        let config_path = std::env::var("GIFTSWAP_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::config_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("giftswap-server")
                    .join("config.yaml")
            });

        Self {
            port,
            data_dir,
            config_path,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "giftswap_server=info,giftswap=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(Config::from_env()).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(&config.data_dir)
        .map_err(|e| format!("Failed to create data directory: {}", e))?;

    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!("Config file: {}", config.config_path.display());

    let state = AppState {
        api_keys: Arc::new(ApiKeys::load(&config.config_path)),
        store: Arc::new(FileDocumentStore::new(&config.data_dir)),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}
