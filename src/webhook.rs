use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use teloxide::Bot;
use tracing::{info, warn};

use crate::config::{Config, EnvPresence};
use crate::handlers::CommandHandlers;
use crate::platform::telegram;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub handlers: CommandHandlers,
    /// Absent when no token is configured
    pub bot: Option<Bot>,
}

impl AppState {
    pub fn new(config: Config, handlers: CommandHandlers) -> Self {
        let bot = config.bot_token().map(Bot::new);
        Self {
            config,
            handlers,
            bot,
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    has_token: bool,
    has_base_url: bool,
}

#[derive(Serialize)]
struct EnvProbeResponse {
    #[serde(rename = "TELEGRAM_TOKEN_in_env")]
    telegram_token_in_env: bool,
    #[serde(rename = "TOKEN_in_env")]
    token_in_env: bool,
    #[serde(rename = "BASE_URL_in_env")]
    base_url_in_env: bool,
    #[serde(rename = "PORT")]
    port: u16,
    #[serde(rename = "TOKEN_masked")]
    token_masked: String,
    #[serde(rename = "BASE_URL")]
    base_url: Option<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/__env", get(env_probe))
        .route("/webhook/{token}", post(receive_update))
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        has_token: state.config.bot_token().is_some(),
        has_base_url: state.config.base_url().is_some(),
    })
}

async fn env_probe(State(state): State<Arc<AppState>>) -> Json<EnvProbeResponse> {
    let EnvPresence {
        telegram_token,
        token,
        base_url,
    } = state.config.env;
    Json(EnvProbeResponse {
        telegram_token_in_env: telegram_token,
        token_in_env: token,
        base_url_in_env: base_url,
        port: state.config.server.port,
        token_masked: state.config.masked_token(),
        base_url: state.config.base_url().map(str::to_string),
    })
}

/// Telegram retries anything but 2xx, so every update that reaches the
/// handler is acknowledged, including ones we fail to parse or answer.
async fn receive_update(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    body: Bytes,
) -> StatusCode {
    let bot = match (&state.bot, state.config.bot_token()) {
        (Some(bot), Some(expected)) if token == expected => bot,
        _ => {
            warn!("Rejected webhook call with unknown token");
            return StatusCode::FORBIDDEN;
        }
    };

    let update = match telegram::parse_update(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!("Dropping update: {}", e);
            return StatusCode::OK;
        }
    };

    let Some(incoming) = telegram::incoming_message(&update) else {
        info!("Ignoring non-text update {:?}", update.id);
        return StatusCode::OK;
    };

    info!(
        "Telegram message from {} ({}) in chat {}: {}",
        incoming.user_name, incoming.user_id, incoming.chat_id, incoming.text
    );

    if let Some(reply) = state.handlers.respond(&incoming.text).await {
        telegram::send_reply(bot, incoming.chat_id, &reply).await;
    }

    StatusCode::OK
}
