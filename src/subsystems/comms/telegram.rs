//! Telegram comms channel: feeds group and private text messages to the
//! plugin and delivers its responses.
//!
//! Telegram has no poke gesture, so poke reactions are skipped by the plugin.

use std::env;
use std::sync::Arc;

use teloxide::payloads::SendPhotoSetters;
use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageEntityKind, ParseMode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::state::{CommsEvent, CommsState};
use super::{Channel, ChannelFuture};
use crate::error::AppError;
use crate::supervision::{MessageEvent, Response};

// ── Constants ────────────────────────────────────────────────────────────────

/// Telegram rejects messages over 4096 characters.
const MAX_MESSAGE_LENGTH: usize = 4000;

// ── TelegramChannel ──────────────────────────────────────────────────────────

pub struct TelegramChannel {
    channel_id: String,
    state: Arc<CommsState>,
}

impl TelegramChannel {
    pub fn new(channel_id: impl Into<String>, state: Arc<CommsState>) -> Self {
        Self { channel_id: channel_id.into(), state }
    }
}

impl Channel for TelegramChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ChannelFuture {
        Box::pin(run_telegram(self.channel_id, self.state, shutdown))
    }
}

// ── TelegramEvent ────────────────────────────────────────────────────────────

struct TelegramEvent {
    sender: String,
    group: Option<String>,
    self_id: String,
    text: String,
    mentions: Vec<String>,
}

impl TelegramEvent {
    /// Structured mentions come from `text_mention` entities only. A plain
    /// `@username` carries no user id and the Bot API cannot resolve one, so
    /// those users are reachable only through `@<numeric id>` in the text.
    fn from_message(msg: &Message, self_id: &str) -> Option<Self> {
        let text = msg.text()?;
        let sender = msg.from.as_ref()?.id.0.to_string();

        let group = (msg.chat.is_group() || msg.chat.is_supergroup()).then(|| msg.chat.id.0.to_string());

        let mentions = msg
            .entities()
            .unwrap_or_default()
            .iter()
            .filter_map(|entity| match &entity.kind {
                MessageEntityKind::TextMention { user } => Some(user.id.0.to_string()),
                MessageEntityKind::Mention => {
                    debug!("ignoring @username mention, no user id attached");
                    None
                }
                _ => None,
            })
            .collect();

        Some(Self {
            sender,
            group,
            self_id: self_id.to_string(),
            text: text.to_string(),
            mentions,
        })
    }
}

impl MessageEvent for TelegramEvent {
    fn sender_id(&self) -> &str {
        &self.sender
    }

    fn group_id(&self) -> Option<&str> {
        self.group.as_deref()
    }

    fn self_id(&self) -> &str {
        &self.self_id
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn mentions(&self) -> &[String] {
        &self.mentions
    }
}

// ── run_telegram ─────────────────────────────────────────────────────────────

async fn run_telegram(
    channel_id: String,
    state: Arc<CommsState>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let token = match env::var("TELEGRAM_BOT_TOKEN") {
        Ok(t) => t,
        Err(_) => {
            warn!(%channel_id, "TELEGRAM_BOT_TOKEN not set, telegram channel exiting");
            return Ok(());
        }
    };

    let bot = Bot::new(token);
    let me = bot
        .get_me()
        .await
        .map_err(|e| AppError::Comms(format!("telegram get_me failed: {e}")))?;
    let self_id = me.id.0.to_string();

    info!(%channel_id, %self_id, "telegram channel starting");
    state.report_event(CommsEvent::ChannelReady { channel_id: channel_id.clone() });

    let state_clone = state.clone();
    let channel_id_clone = channel_id.clone();

    let handler = Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
        let state = state_clone.clone();
        let channel_id = channel_id_clone.clone();
        let self_id = self_id.clone();
        async move {
            if let Some(event) = TelegramEvent::from_message(&msg, &self_id) {
                debug!(%channel_id, sender = %event.sender, group = ?event.group, "telegram received message");
                if let Some(response) = state.dispatch(&event).await {
                    deliver(&bot, msg.chat.id, response).await;
                }
            }
            respond(())
        }
    });

    let mut dispatcher = Dispatcher::builder(bot, handler).build();

    tokio::select! {
        biased;

        _ = shutdown.cancelled() => {
            info!(%channel_id, "shutdown signal received, closing telegram channel");
        }
        _ = dispatcher.dispatch() => {
            warn!(%channel_id, "telegram dispatcher exited unexpectedly");
        }
    }

    state.report_event(CommsEvent::ChannelShutdown { channel_id });
    Ok(())
}

/// Send `response` into `chat`. Failures are logged, never retried.
async fn deliver(bot: &Bot, chat: ChatId, response: Response) {
    match response {
        Response::Text(text) => {
            for chunk in split_message(&text, MAX_MESSAGE_LENGTH) {
                if let Err(e) = bot.send_message(chat, chunk).await {
                    warn!("failed to send telegram reply: {e}");
                    break;
                }
            }
        }
        Response::MentionImage { user_id, image } => {
            let caption = format!("<a href=\"tg://user?id={user_id}\">@{user_id}</a>");
            if let Err(e) = bot
                .send_photo(chat, InputFile::file(image))
                .caption(caption)
                .parse_mode(ParseMode::Html)
                .await
            {
                warn!("failed to send telegram photo: {e}");
            }
        }
        Response::Poke { user_id, .. } => {
            warn!(%user_id, "telegram has no poke, dropping response");
        }
    }
}

/// Cut `text` into pieces of at most `max` characters.
fn split_message(text: &str, max: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(max.max(1)).map(|chunk| chunk.iter().collect()).collect()
}
