mod cmd;
mod config;
mod errors;
mod models;
mod routes;
mod seed;
mod state;
mod store;
mod validation;

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cmd::{Cli, Command};
use crate::config::Config;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::Stores;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Career Hub API v{}", env!("CARGO_PKG_VERSION"));

    // The store handle lives for the whole process and is shared by every request
    let stores = store::connect(&config).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(stores, config).await,
        Command::Seed { file, replace } => {
            let jobs = seed::load_file(&file).await?;
            info!("Loaded {} jobs from {}", jobs.len(), file.display());
            seed::seed_jobs(stores.jobs.as_ref(), jobs, replace).await?;
            Ok(())
        }
    }
}

async fn serve(stores: Stores, config: Config) -> Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    let state = AppState::new(stores, config);

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
