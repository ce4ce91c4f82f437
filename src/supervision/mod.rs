//! Supervision plugin: timed watch list over group members.
//!
//! A moderator puts users under supervision with `监督`; while a record is
//! live, every group message from that user may trigger one random
//! reaction (meme image, LLM scolding, or a poke).
//!
//! # Layout
//!
//! - [`tracker`] owns the `user_id -> expires_at` map and its persistence.
//! - [`command`] parses the three text commands and their mentions.
//! - [`reaction`] maps a uniform draw onto a weighted reaction.
//! - [`plugin`] is the per-message entry point channels call.
//!
//! Expired records are swept lazily on every message and list query; there
//! is no background timer.

pub mod clock;
pub mod command;
pub mod event;
pub mod images;
pub mod plugin;
pub mod reaction;
pub mod store;
pub mod tracker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use event::{MessageEvent, Response};
pub use plugin::SupervisorPlugin;
pub use store::{JsonFileStore, MemoryStore, SupervisionStore};
pub use tracker::{ActiveSupervision, SupervisionTracker};
