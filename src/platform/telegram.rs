use teloxide::prelude::*;
use teloxide::types::{Update, UpdateKind};
use tracing::{info, warn};

use crate::error::BotError;
use crate::platform::IncomingMessage;

/// Deserialize a webhook body into an `Update`.
pub fn parse_update(body: &[u8]) -> Result<Update, BotError> {
    Ok(serde_json::from_slice(body)?)
}

/// Reduce an update to a text message; anything else yields `None`.
/// Edited messages count, so a corrected command is answered too.
pub fn incoming_message(update: &Update) -> Option<IncomingMessage> {
    let msg = match &update.kind {
        UpdateKind::Message(msg) | UpdateKind::EditedMessage(msg) => msg,
        _ => return None,
    };
    let text = msg.text()?.to_string();

    let (user_id, user_name) = match msg.from.as_ref() {
        Some(user) => (user.id.0.to_string(), user.first_name.clone()),
        None => (String::new(), String::new()),
    };

    Some(IncomingMessage {
        user_id,
        chat_id: msg.chat.id.0,
        user_name,
        text,
    })
}

/// Deliver a reply; failures are logged, never returned.
pub async fn send_reply(bot: &Bot, chat_id: i64, text: &str) {
    match bot.send_message(ChatId(chat_id), text).await {
        Ok(_) => info!("Replied to chat {}", chat_id),
        Err(e) => warn!("Failed to send reply to chat {}: {}", chat_id, e),
    }
}

/// Point Telegram at our webhook endpoint.
pub async fn register_webhook(bot: &Bot, webhook_url: &str) -> anyhow::Result<()> {
    let url = reqwest::Url::parse(webhook_url)?;
    bot.set_webhook(url).await?;
    Ok(())
}
