mod config;
mod error;
mod handlers;
mod platform;
mod rates;
mod webhook;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::handlers::CommandHandlers;
use crate::platform::telegram;
use crate::rates::BocRateSource;
use crate::webhook::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fxbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  TELEGRAM_TOKEN in env: {}", config.env.telegram_token);
    info!("  TOKEN in env: {}", config.env.token);
    info!("  BASE_URL in env: {}", config.env.base_url);
    info!("  Token (masked): {}", config.masked_token());
    info!("  Base URL: {}", config.base_url().unwrap_or("None"));
    info!("  Rate source: {}", config.rate.source_url);

    let rates = BocRateSource::new(config.rate.source_url.clone(), config.rate.timeout())
        .context("Failed to build rate source HTTP client")?;
    let mut handlers = CommandHandlers::new(&config, Arc::new(rates));

    // Needed to ignore "/start@OtherBot" in group chats
    if let (Some(token), None) = (config.bot_token(), &config.telegram.bot_username) {
        match Bot::new(token).get_me().await {
            Ok(me) => {
                info!("  Bot username: @{}", me.username());
                handlers = handlers.with_bot_username(me.username());
            }
            Err(e) => warn!("Failed to get bot info, accepting commands for any bot: {}", e),
        }
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, handlers));

    match (&state.bot, state.config.webhook_url()) {
        (None, _) => {
            warn!("No bot token (TELEGRAM_TOKEN or TOKEN); serving health routes only");
        }
        (Some(_), None) => {
            warn!("BASE_URL not set; webhook not registered");
        }
        (Some(bot), Some(url)) => {
            telegram::register_webhook(bot, &url)
                .await
                .context("Failed to register webhook")?;
            let base = state.config.base_url().unwrap_or_default();
            info!("Webhook registered at {}/webhook/<token>", base.trim_end_matches('/'));
        }
    }

    let app = webhook::router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Shutting down");
        })
        .await
        .context("Server error")?;

    Ok(())
}
