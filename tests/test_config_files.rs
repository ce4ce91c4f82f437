//! The shipped config file must load and carry the documented defaults.

use std::path::Path;

use supervise_bot::config::{self, DEFAULT_MINUTE, DEFAULT_SUPERVISOR_PROMPT};
use supervise_bot::llm::providers;
use supervise_bot::supervision::reaction::{Reaction, ReactionWeights};

#[test]
fn test_default_toml_loads() {
    let cfg = config::load_from(Path::new("config/default.toml"), Some("/tmp/supervise-test"), None)
        .expect("config/default.toml should parse");
    assert_eq!(cfg.supervision.default_minute, DEFAULT_MINUTE);
    assert_eq!(cfg.supervision.supervisor_prompt, DEFAULT_SUPERVISOR_PROMPT);
    assert_eq!(cfg.supervision.image_dir, Path::new("/tmp/supervise-test/image"));
    assert_eq!(cfg.supervision.reactions, ReactionWeights::default());
    assert!(cfg.comms_pty_should_load());
    assert!(!cfg.comms_telegram_should_load());
}

#[test]
fn test_default_toml_provider_builds() {
    let cfg = config::load_from(Path::new("config/default.toml"), None, None).unwrap();
    assert!(providers::build(&cfg.llm, None).is_ok());
}

#[test]
fn test_default_weights_boundaries() {
    let cfg = config::load_from(Path::new("config/default.toml"), None, None).unwrap();
    let w = cfg.supervision.reactions;
    assert_eq!(w.select(0.39), Reaction::Image);
    assert_eq!(w.select(0.4), Reaction::Scold);
    assert_eq!(w.select(0.8), Reaction::Poke);
}
