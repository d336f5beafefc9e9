use std::net::SocketAddr;

use taskhub_server::{
    app::{build_router, AppState},
    config::Config,
    db::Database,
    services::storage::BlobStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskhub_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize database
    let db = Database::connect(&config.database_url).await?;
    db.run_migrations().await?;

    // Ensure the upload directory exists
    let blobs = BlobStore::new(config.upload_dir.clone());
    blobs.init().await?;

    let port = config.port;
    let state = AppState { db, config, blobs };

    let app = build_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
