//! Arbol - community survey backend for the Arbol de la Vida

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arbol::{auth, config::Args, server, store::Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("arbol={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Arbol de la Vida - survey backend");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("Database: {}", args.db_path.display());
    info!(
        "Mode: {}",
        if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" }
    );

    let store = Store::open(&args.db_path)?;

    // Bootstrap the configured admin account, if any
    if let (Some(name), Some(password)) = (&args.admin_name, &args.admin_password) {
        let hash = auth::hash_password(password)?;
        store.bootstrap_admin(name, &hash)?;
        info!("Admin account '{}' ready", name);
    }

    // Seed the three base questions on a fresh database
    if args.seed_questions {
        if store.seed_default_questions()? {
            info!("Seeded default questions (trunk, branches, leaves)");
        }
    }

    let state = Arc::new(server::AppState::new(args, store));
    server::run(state).await?;

    Ok(())
}
