//! Console comms channel: a one-terminal stand-in for a group chat.
//!
//! Each stdin line is a message from a named sender:
//!
//! ```text
//! 10001: 监督 @10002 5     group message in the console group
//! 10002: 摸鱼ing            (reaction if 10002 is supervised)
//! 10001> 监督列表            private message to the bot
//! ```
//!
//! Replies are printed to stdout. The console can "poke", so every reaction
//! kind is observable here. Runs until the `shutdown` token is cancelled
//! (Ctrl-C) or stdin is closed.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::state::{CommsEvent, CommsState};
use super::{Channel, ChannelFuture};
use crate::error::AppError;
use crate::supervision::{MessageEvent, Response};

// ── PtyChannel ───────────────────────────────────────────────────────────────

pub struct PtyChannel {
    channel_id: String,
    self_id: String,
    group_id: String,
    state: Arc<CommsState>,
}

impl PtyChannel {
    pub fn new(
        channel_id: impl Into<String>,
        self_id: impl Into<String>,
        group_id: impl Into<String>,
        state: Arc<CommsState>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            self_id: self_id.into(),
            group_id: group_id.into(),
            state,
        }
    }
}

impl Channel for PtyChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ChannelFuture {
        Box::pin(run_pty(*self, shutdown))
    }
}

// ── ConsoleEvent ─────────────────────────────────────────────────────────────

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleEvent {
    sender: String,
    group: Option<String>,
    self_id: String,
    text: String,
    // Console input has no structured mentions; `@123` tokens stay in `text`.
    mentions: Vec<String>,
}

impl ConsoleEvent {
    /// Parse `<sender>: <text>` (group) or `<sender>> <text>` (private).
    ///
    /// The sender must be a single non-empty token. Lines without either
    /// separator are rejected.
    pub fn parse(line: &str, self_id: &str, group_id: &str) -> Option<Self> {
        let idx = line.find([':', '>'])?;
        let sender = line[..idx].trim();
        if sender.is_empty() || sender.contains(char::is_whitespace) {
            return None;
        }

        let group = match line.as_bytes()[idx] {
            b':' => Some(group_id.to_string()),
            _ => None,
        };

        Some(Self {
            sender: sender.to_string(),
            group,
            self_id: self_id.to_string(),
            text: line[idx + 1..].trim().to_string(),
            mentions: Vec::new(),
        })
    }
}

impl MessageEvent for ConsoleEvent {
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

    fn supports_poke(&self) -> bool {
        true
    }
}

/// Console rendering of a plugin response.
pub fn render(response: &Response) -> String {
    match response {
        Response::Text(text) => format!("[bot]{}{text}", if text.starts_with(' ') { "" } else { " " }),
        Response::MentionImage { user_id, image } => {
            format!("[bot] @{user_id} [image: {}]", image.display())
        }
        Response::Poke { user_id, group_id } => format!("[bot] *pokes {user_id} in {group_id}*"),
    }
}

// ── run_pty ──────────────────────────────────────────────────────────────────

async fn run_pty(channel: PtyChannel, shutdown: CancellationToken) -> Result<(), AppError> {
    let PtyChannel { channel_id, self_id, group_id, state } = channel;

    info!(%channel_id, %group_id, "pty channel started, type `<id>: <message>`. Ctrl-C to quit.");
    println!("─────────────────────────────────────────");
    println!(" supervise-bot console  (Ctrl-C to quit)");
    println!(" <id>: <msg>  group   |  <id>> <msg>  dm");
    println!("─────────────────────────────────────────");
    state.report_event(CommsEvent::ChannelReady { channel_id: channel_id.clone() });

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!("pty channel shutting down");
                break;
            }

            line = lines.next_line() => {
                match line {
                    Err(e) => {
                        warn!("pty read error: {e}");
                        break;
                    }
                    Ok(None) => {
                        info!("pty stdin closed");
                        break;
                    }
                    Ok(Some(input)) => {
                        let input = input.trim();
                        if input.is_empty() { continue; }

                        let Some(event) = ConsoleEvent::parse(input, &self_id, &group_id) else {
                            println!("[pty] expected `<id>: <message>` or `<id>> <message>`");
                            continue;
                        };
                        debug!(sender = %event.sender, group = ?event.group, "pty received line");

                        if let Some(response) = state.dispatch(&event).await {
                            println!("{}", render(&response));
                        }
                    }
                }
            }
        }
    }

    state.report_event(CommsEvent::ChannelShutdown { channel_id });
    Ok(())
}
