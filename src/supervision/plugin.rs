//! Per-message entry point.
//!
//! [`SupervisorPlugin::handle`] is called by a channel for every incoming
//! message. Commands are answered directly; any other group message from a
//! supervised sender may produce one reaction. Every failure on the
//! reaction path (no images, LLM error, no poke support) degrades to "no
//! reply" and is only logged.

use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, info};

use super::command::{self, Command};
use super::event::{MessageEvent, Response};
use super::images::pick_random_image;
use super::reaction::Reaction;
use super::tracker::SupervisionTracker;
use crate::config::SupervisionConfig;
use crate::llm::LlmProvider;

pub const REPLY_SUPERVISE_NEEDS_TARGET: &str = "请 @ 要监督的对象";
pub const REPLY_UNSUPERVISE_NEEDS_TARGET: &str = "请 @ 要解除监督的对象";
pub const REPLY_LIST_EMPTY: &str = "当前没有正在监督的对象";

pub struct SupervisorPlugin {
    config: SupervisionConfig,
    // Never held across an await.
    tracker: Mutex<SupervisionTracker>,
    llm: LlmProvider,
    rng: Mutex<StdRng>,
}

impl SupervisorPlugin {
    pub fn new(config: SupervisionConfig, tracker: SupervisionTracker, llm: LlmProvider) -> Self {
        Self::with_rng(config, tracker, llm, StdRng::from_entropy())
    }

    /// Same as [`new`](Self::new) with a caller-supplied rng, so reaction
    /// draws can be replayed.
    pub fn with_rng(
        config: SupervisionConfig,
        tracker: SupervisionTracker,
        llm: LlmProvider,
        rng: StdRng,
    ) -> Self {
        Self {
            config,
            tracker: Mutex::new(tracker),
            llm,
            rng: Mutex::new(rng),
        }
    }

    /// Handle one incoming message. Returns at most one action to deliver.
    pub async fn handle<E: MessageEvent + ?Sized>(&self, event: &E) -> Option<Response> {
        if let Some(cmd) = command::parse(event.text()) {
            debug!(sender = %event.sender_id(), command = ?cmd, "supervision command");
            return Some(Response::Text(self.run_command(cmd, event)));
        }

        let group_id = event.group_id()?;
        self.react(event, group_id).await
    }

    pub fn is_supervising(&self, user_id: &str) -> bool {
        self.tracker().is_supervising(user_id)
    }

    /// Execute a parsed command and return the text reply.
    pub fn run_command<E: MessageEvent + ?Sized>(&self, cmd: Command, event: &E) -> String {
        match cmd {
            Command::Supervise { minutes } => {
                let targets = command::mentioned_ids(event);
                if targets.is_empty() {
                    return REPLY_SUPERVISE_NEEDS_TARGET.to_string();
                }
                let minutes = minutes.unwrap_or(self.config.default_minute);
                self.tracker().supervise(&targets, minutes);
                format!("已监督 {}，时长 {minutes} 分钟", format_ids(&targets))
            }
            Command::Unsupervise => {
                let targets = command::mentioned_ids(event);
                if targets.is_empty() {
                    return REPLY_UNSUPERVISE_NEEDS_TARGET.to_string();
                }
                self.tracker().unsupervise(&targets);
                format!("已解除监督: {}", format_ids(&targets))
            }
            Command::List => {
                let active = self.tracker().list_active();
                if active.is_empty() {
                    return REPLY_LIST_EMPTY.to_string();
                }
                let lines: Vec<String> = active
                    .iter()
                    .map(|a| format!("{}（剩余 {} 分钟）", a.user_id, a.remaining_minutes))
                    .collect();
                format!("监督中：\n{}", lines.join("\n"))
            }
        }
    }

    async fn react<E: MessageEvent + ?Sized>(&self, event: &E, group_id: &str) -> Option<Response> {
        let sender = event.sender_id();

        let supervised = {
            let mut tracker = self.tracker();
            tracker.cleanup_expired();
            tracker.is_supervising(sender)
        };
        if !supervised {
            return None;
        }

        let (reaction, image) = {
            let mut rng = self.rng();
            let reaction = self.config.reactions.select(rng.gen_range(0.0..1.0));
            let image = match reaction {
                Reaction::Image => pick_random_image(&self.config.image_dir, &mut *rng),
                _ => None,
            };
            (reaction, image)
        };
        info!(%sender, group = %group_id, %reaction, "reacting to supervised user");

        match reaction {
            Reaction::Image => image.map(|image| Response::MentionImage {
                user_id: sender.to_string(),
                image,
            }),
            Reaction::Scold => self.scold(event.text()).await.map(Response::Text),
            Reaction::Poke if event.supports_poke() => Some(Response::Poke {
                user_id: sender.to_string(),
                group_id: group_id.to_string(),
            }),
            Reaction::Poke => {
                debug!(%sender, "platform cannot poke, skipping");
                None
            }
        }
    }

    /// LLM scolding for `text`, prefixed with a space; `None` on failure.
    async fn scold(&self, text: &str) -> Option<String> {
        let prompt = format!("他来水群了：{text}");
        match self.llm.complete(&prompt, Some(&self.config.supervisor_prompt)).await {
            Ok(reply) => Some(format!(" {reply}")),
            Err(e) => {
                error!(provider = self.llm.name(), error = %e, "LLM scolding failed");
                None
            }
        }
    }

    fn tracker(&self) -> MutexGuard<'_, SupervisionTracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn format_ids(ids: &[String]) -> String {
    format!("[{}]", ids.join(", "))
}
