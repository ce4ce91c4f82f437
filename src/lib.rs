//! supervise-bot: put group members under timed supervision and react to
//! their messages.
//!
//! The plugin core lives in [`supervision`]; [`subsystems`] hosts it on
//! concrete chat channels.

pub mod config;
pub mod error;
pub mod llm;
pub mod logger;
pub mod subsystems;
pub mod supervision;
