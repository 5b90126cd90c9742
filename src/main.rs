//! Credcheck server
//!
//! ## Usage
//!
//! ```bash
//! # Start with defaults
//! credcheck
//!
//! # Start with custom config
//! credcheck --config /path/to/config.toml
//!
//! # Start with custom HTTP port
//! credcheck --http-port 8331
//!
//! # Start with custom database path
//! credcheck --db-path /data/registry.db
//! ```
//!
//! ## HTTP API
//!
//! - `GET /health` - Health check
//! - `GET /stats` - Row counts per registry table
//! - `GET|POST /certificates`, `GET|PATCH /certificates/{id}`
//! - `GET|POST /institutions`, `PATCH /institutions/{id}`
//! - `POST /verifications`, `GET /verifications/recent`
//! - `GET|POST /flags`, `PATCH /flags/{id}`

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use credcheck::{create_router, AppState, Config, RegistryDb};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "credcheck")]
#[command(about = "Certificate and credential verification registry backend")]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the SQLite registry database
    #[arg(long, env = "CREDCHECK_DB_PATH")]
    db_path: Option<PathBuf>,

    /// HTTP API port
    #[arg(long, env = "CREDCHECK_HTTP_PORT")]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("credcheck=info".parse()?))
        .init();

    let args = Args::parse();

    let mut config = if let Some(config_path) = &args.config {
        Config::load(config_path)?
    } else {
        Config::default()
    };

    // Apply CLI overrides
    if let Some(db_path) = args.db_path {
        config.db_path = db_path;
    }
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }

    let db = RegistryDb::open(&config.db_path)?;
    let state = AppState { db: Arc::new(db) };
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    info!("credcheck listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
