//! Text commands and mention extraction.
//!
//! ```text
//! 监督 [@user...] [minutes]   put users under supervision
//! 解除监督 [@user...]          lift supervision
//! 监督列表                      list live records
//! ```
//!
//! A leading `/` is accepted. Keywords are matched longest first, so
//! `监督列表` is never read as `监督` followed by `列表`.

use super::event::MessageEvent;

pub const SUPERVISE: &str = "监督";
pub const UNSUPERVISE: &str = "解除监督";
pub const LIST: &str = "监督列表";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `minutes` is `None` when the last token was not a plain number.
    Supervise { minutes: Option<u32> },
    Unsupervise,
    List,
}

/// Recognise a command at the start of `text`.
///
/// The keyword must be followed by whitespace or end of input: `监督他` is
/// ordinary chatter, not a command.
pub fn parse(text: &str) -> Option<Command> {
    let body = text.trim_start();
    let body = body.strip_prefix('/').unwrap_or(body);

    if keyword_matches(body, UNSUPERVISE) {
        return Some(Command::Unsupervise);
    }
    if keyword_matches(body, LIST) {
        return Some(Command::List);
    }
    if keyword_matches(body, SUPERVISE) {
        return Some(Command::Supervise { minutes: trailing_minutes(body) });
    }
    None
}

fn keyword_matches(body: &str, keyword: &str) -> bool {
    body.strip_prefix(keyword)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
}

/// Last whitespace-separated token, if it is all ASCII digits and fits `u32`.
fn trailing_minutes(body: &str) -> Option<u32> {
    let last = body.split_whitespace().last()?;
    if !last.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    last.parse().ok()
}

/// Everyone the message mentions, minus the bot itself.
///
/// Structured mentions come first, then literal `@<digits>` tokens from the
/// text. Duplicates keep their first position.
pub fn mentioned_ids<E: MessageEvent + ?Sized>(event: &E) -> Vec<String> {
    let literal = event
        .text()
        .split_whitespace()
        .filter_map(|tok| tok.strip_prefix('@'))
        .filter(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()));

    let mut out: Vec<String> = Vec::new();
    for id in event.mentions().iter().map(String::as_str).chain(literal) {
        if id == event.self_id() || out.iter().any(|seen| seen == id) {
            continue;
        }
        out.push(id.to_string());
    }
    out
}
