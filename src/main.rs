use anyhow::Result;
use log::{info, warn};
use pothole_detector::api::rest::RestApi;
use pothole_detector::{config, db::DatabaseService};
use std::path::PathBuf;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        // Without a signal handler the server runs until the process is killed
        std::future::pending::<()>().await;
    }
    info!("Shutting down...");
}

async fn run_app() -> Result<()> {
    // Optional path to a .toml or .json config file
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = config::load_config(config_path.as_deref())?;

    // Initialize logging; RUST_LOG overrides the configured level
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.api.log_level.as_str()),
    )
    .init();
    info!("Starting Pothole Detector Backend");

    match &config_path {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => info!("Using default configuration"),
    }

    // Opens the database and ensures the schema before any request is accepted
    let database = DatabaseService::new(&config.database).await?;

    let http_server = RestApi::new(&config.api, database.pool.clone());
    http_server.run(shutdown_signal()).await?;

    database.close().await;
    info!("Database closed");

    Ok(())
}

fn main() {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run_app()) {
        eprintln!("Application error: {:#}", e);
        std::process::exit(1);
    }
}
