//! Tsundoku - reading-deadline shaming backend

use clap::Parser;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tsundoku::{
    auth::TokenIssuer,
    config::Args,
    db::{BookStore, InMemoryStore, MongoClient, MongoStore, UserStore},
    server::{self, AppState},
    services::{self, spawn_sweep_task, DeadlineSweeper, LineMessenger},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("tsundoku={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Tsundoku - reading-deadline backend");
    info!("  \"Read it, or hear about it\"");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB: {} (db {})", args.mongodb_uri, args.mongodb_db);
    info!(
        "Sweep statuses: {}",
        args.sweep_statuses()
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    match args.sweep_interval() {
        Some(interval) => info!("In-process sweep every {}s", interval.as_secs()),
        None => info!("In-process sweep disabled (use /api/cron/check)"),
    }
    info!("======================================");

    let tokens = match TokenIssuer::from_args(&args) {
        Ok(tokens) => tokens,
        Err(e) => {
            error!("Token issuer setup failed: {}", e);
            std::process::exit(1);
        }
    };
    info!("Custom tokens signed with {:?}", tokens.algorithm());

    // MongoDB is optional in dev mode
    let (books, users) = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => {
            info!("MongoDB connected successfully");
            let store = Arc::new(MongoStore::new(&client).await?);
            let books: Arc<dyn BookStore> = store.clone();
            let users: Arc<dyn UserStore> = store;
            (books, users)
        }
        Err(e) => {
            if args.dev_mode {
                warn!("MongoDB connection failed (dev mode, using in-memory store): {}", e);
                let store = Arc::new(InMemoryStore::new());
                let books: Arc<dyn BookStore> = store.clone();
                let users: Arc<dyn UserStore> = store;
                (books, users)
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    if args.line_channel_access_token.is_none() {
        warn!("LINE_CHANNEL_ACCESS_TOKEN not set - every push will fail");
    }
    let messenger = Arc::new(LineMessenger::new(
        &args.line_api_url,
        args.line_channel_access_token.clone(),
        args.request_timeout(),
    ));

    let sweeper = Arc::new(DeadlineSweeper::new(
        books.clone(),
        services::insult_source(&args),
        messenger,
        args.sweep_statuses(),
    ));

    if let Some(interval) = args.sweep_interval() {
        spawn_sweep_task(Arc::clone(&sweeper), interval);
    }

    let scheduler = services::notification_scheduler(&args);

    let state = Arc::new(AppState {
        args,
        books,
        users,
        tokens,
        sweeper,
        scheduler,
        started_at: Instant::now(),
    });

    server::run(state).await?;

    Ok(())
}
