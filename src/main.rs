use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use image_transform_service::{
    cache::LruCacheStore,
    config::Config,
    database::Database,
    models::FormatTable,
    storage::{KeyPolicy, LocalBlobStore, UrlSigner},
    web::{AppState, WebServer},
};

#[derive(Parser)]
#[command(name = "image-transform-service")]
#[command(version)]
#[command(about = "Upload images and transform them on demand")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Database URL (overrides config file)
    #[arg(short = 'd', long, value_name = "URL")]
    database_url: Option<String>,

    /// Blob storage directory (overrides config file)
    #[arg(short = 'b', long, value_name = "DIR")]
    blob_path: Option<String>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    info!(
        "Starting image transform service v{}",
        env!("CARGO_PKG_VERSION")
    );

    let mut config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(database_url) = cli.database_url {
        config.database.url = database_url;
    }
    if let Some(blob_path) = cli.blob_path {
        config.storage.blob_path = blob_path.into();
    }
    let config = Arc::new(config);

    let database = Database::new(&config.database).await?;
    database.migrate().await?;
    info!("Database connection established and migrations applied");

    let formats = Arc::new(FormatTable::default());
    let signer = UrlSigner::new(
        &config.web.base_url,
        config.storage.signing_secret.clone(),
    )?;
    let blobs = LocalBlobStore::new(
        config.storage.blob_path.clone(),
        KeyPolicy::new(config.storage.key_prefix.clone(), formats.clone()),
        signer,
        config.storage.signed_url_ttl,
    )
    .await?;
    info!("Blob store ready at {}", config.storage.blob_path.display());

    let cache = LruCacheStore::new(config.cache.capacity);

    let state = AppState::assemble(
        config.clone(),
        database,
        Arc::new(blobs),
        Arc::new(cache),
        formats,
    );

    let web_server = WebServer::new(state)?;
    info!("Starting web server on {}", web_server.addr());
    web_server.serve().await?;

    Ok(())
}

fn init_tracing(cli: &Cli) {
    let log_filter = if cli.log_level == "trace" {
        format!("image_transform_service={},tower_http=trace", cli.log_level)
    } else {
        format!("image_transform_service={}", cli.log_level)
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| log_filter.into());

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
