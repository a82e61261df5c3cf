use std::sync::Arc;
use tracing::info;

use autochecar::config::Config;
use autochecar::registry::engine::RegistryEngine;
use autochecar::seed;
use autochecar::web::server::WebServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "autochecar=info".into()),
        )
        .init();

    info!("🚗 autochecar v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load config
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "autochecar.toml".to_string());

    let config = Config::load_or_default(&config_path)?;
    info!("Config loaded from {}", config_path);

    let config = Arc::new(config);

    // Initialize registry engine (contains store, catalog, journal, ranking)
    let engine = Arc::new(RegistryEngine::new(config.clone())?);

    // Optional seed data
    if let Some(seed_path) = config.seed.path.clone() {
        let loaded = seed::load(&engine, &seed_path)?;
        info!("Seeded {} vehicles from {}", loaded, seed_path);
    }

    // Prime the ranking snapshot, then keep it fresh in the background
    engine.refresh_ranking();
    let ranking_engine = engine.clone();
    tokio::spawn(async move {
        ranking_engine.run_ranking_loop().await;
    });

    // Run the API server on the main task
    let web = WebServer::new(engine, config);
    web.run().await
}
