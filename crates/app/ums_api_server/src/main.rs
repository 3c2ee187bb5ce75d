//! UMS API server binary.
//!
//! Reads configuration from the environment (and `.env`), lets a few values be
//! overridden on the command line, and serves the API until Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use ums_api::config::ApiConfig;
use ums_core::images::LocalImageStore;
use ums_core::store::{MemoryUserStore, PgUserStore, UserStore};

/// CLI arguments. Anything not given falls back to the environment.
#[derive(Parser, Debug)]
#[command(name = "ums_api_server", about = "UMS API server")]
struct Args {
    /// Address to listen on.
    #[arg(long)]
    bind: Option<String>,

    /// PostgreSQL connection URL. Without one, users live in memory.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Directory profile images are written to.
    #[arg(long)]
    upload_dir: Option<PathBuf>,
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new("info,ums_api=debug,ums_core=debug")
                }),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env();
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(upload_dir) = args.upload_dir {
        config.upload_dir = upload_dir;
    }
    config.database_url = args
        .database_url
        .filter(|url| !url.trim().is_empty())
        .or(config.database_url);

    info!(?config, "starting ums_api_server");

    let store: Arc<dyn UserStore> = match &config.database_url {
        Some(url) => {
            info!(max_connections = args.max_connections, "connecting to PostgreSQL");
            let pool = PgPoolOptions::new()
                .max_connections(args.max_connections)
                .acquire_timeout(std::time::Duration::from_secs(30))
                .connect(url)
                .await?;

            info!("running database migrations");
            ums_core::migrate::migrate(&pool).await?;
            Arc::new(PgUserStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, users are kept in memory and lost on exit");
            Arc::new(MemoryUserStore::new())
        }
    };

    tokio::fs::create_dir_all(&config.upload_dir).await?;
    let images = Arc::new(LocalImageStore::new(
        config.upload_dir.clone(),
        config.public_base_url.clone(),
    ));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;

    let state = ums_api::AppState::new(config, store, images);
    let app = ums_api::router(state);

    info!(addr = %local_addr, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}
