//! Habitracked - habit tracking backend

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use habitracked::{
    config::Args,
    db::MongoClient,
    server,
    store::{HabitStore, MemoryStore, MongoStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("habitracked={},info", args.log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if args.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Habitracked");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB database: {}", args.mongodb_db);
    info!("CORS origin: {}", args.cors_origin);
    info!("======================================");

    let jwt = args.jwt_validator()?;

    // Connect to MongoDB (in-memory fallback in dev mode)
    let store: Arc<dyn HabitStore> = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => Arc::new(MongoStore::new(&client).await?),
        Err(e) => {
            if args.dev_mode {
                warn!("MongoDB connection failed (dev mode, using in-memory store): {}", e);
                Arc::new(MemoryStore::new())
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    let state = Arc::new(server::AppState::new(args, store, jwt));
    server::run(state).await?;

    Ok(())
}
