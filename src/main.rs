use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cinedex::config::Config;
use cinedex::storage::LocalBlobStore;
use cinedex::AppState;

#[derive(Parser, Debug)]
#[command(name = "cinedex")]
#[command(author, version, about = "A movie catalog and watchlist API", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "cinedex.toml")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,

    /// Override the database URL
    #[arg(long, env = "CINEDEX_DATABASE_URL")]
    database_url: Option<String>,

    /// Override the session token signing secret
    #[arg(long, env = "CINEDEX_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Override the listening port
    #[arg(short, long, env = "CINEDEX_PORT")]
    port: Option<u16>,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.database_url {
            config.database.url = url.clone();
        }
        if let Some(secret) = &self.jwt_secret {
            config.auth.jwt_secret = secret.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load(&cli.config)?;
    cli.apply(&mut config);

    // Initialize logging
    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting cinedex v{}", env!("CARGO_PKG_VERSION"));

    if config.ensure_jwt_secret() {
        tracing::warn!(
            "No JWT secret configured; using a random one. Sessions will not survive a restart."
        );
    }

    // Initialize database
    let db = cinedex::db::init(&config.database).await?;

    // Ensure default admin user exists
    cinedex::api::auth::ensure_admin_user(&db, &config.auth).await?;

    // Poster storage
    let images = LocalBlobStore::new(&config.storage.images_dir);
    images.ensure_dir().await.with_context(|| {
        format!(
            "Failed to create images directory: {}",
            config.storage.images_dir.display()
        )
    })?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, db, Arc::new(images))?);
    let app = cinedex::api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
