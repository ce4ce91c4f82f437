//! End-to-end plugin behaviour against the JSON state file.

use std::fs;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::TempDir;

use supervise_bot::config::Config;
use supervise_bot::llm::LlmProvider;
use supervise_bot::llm::providers::dummy::DummyProvider;
use supervise_bot::supervision::reaction::ReactionWeights;
use supervise_bot::supervision::{
    JsonFileStore, ManualClock, MessageEvent, Response, SupervisionStore, SupervisionTracker,
    SupervisorPlugin,
};

const T0: i64 = 1_700_000_000;
const BOT: &str = "999";

struct GroupMessage {
    sender: String,
    text: String,
    mentions: Vec<String>,
}

fn msg(sender: &str, text: &str) -> GroupMessage {
    GroupMessage { sender: sender.into(), text: text.into(), mentions: Vec::new() }
}

impl MessageEvent for GroupMessage {
    fn sender_id(&self) -> &str {
        &self.sender
    }
    fn group_id(&self) -> Option<&str> {
        Some("123456")
    }
    fn self_id(&self) -> &str {
        BOT
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

fn plugin(tmp: &TempDir, clock: Arc<ManualClock>, weights: ReactionWeights) -> SupervisorPlugin {
    let mut cfg = Config::test_default(tmp.path()).supervision;
    cfg.reactions = weights;
    let store = JsonFileStore::new(&cfg.state_file);
    let tracker = SupervisionTracker::load(Box::new(store), clock).unwrap();
    SupervisorPlugin::with_rng(cfg, tracker, LlmProvider::Dummy(DummyProvider), StdRng::seed_from_u64(3))
}

fn text(r: Option<Response>) -> String {
    match r {
        Some(Response::Text(t)) => t,
        other => panic!("expected text reply, got {other:?}"),
    }
}

#[tokio::test]
async fn state_survives_restart() {
    let tmp = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(T0));

    let first = plugin(&tmp, clock.clone(), ReactionWeights::default());
    text(first.handle(&msg("1", "监督 @42 @43 20")).await);
    text(first.handle(&msg("1", "解除监督 @43")).await);
    drop(first);

    let saved = JsonFileStore::new(tmp.path().join("supervisors.json")).load().unwrap();
    assert_eq!(saved.get("42"), Some(&(T0 + 1200)));
    assert!(!saved.contains_key("43"));

    clock.advance(300);
    let second = plugin(&tmp, clock.clone(), ReactionWeights::default());
    assert!(second.is_supervising("42"));
    assert_eq!(text(second.handle(&msg("1", "监督列表")).await), "监督中：\n42（剩余 15 分钟）");
}

#[tokio::test]
async fn expiry_is_swept_from_disk_on_next_message() {
    let tmp = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(T0));
    let p = plugin(&tmp, clock.clone(), ReactionWeights::new(0.0, 1.0, 0.0).unwrap());

    text(p.handle(&msg("1", "监督 @42 1")).await);
    assert!(p.handle(&msg("42", "hi")).await.is_some());

    clock.advance(61);
    assert!(p.handle(&msg("42", "hi")).await.is_none());

    let saved = JsonFileStore::new(tmp.path().join("supervisors.json")).load().unwrap();
    assert!(saved.is_empty());
}

#[tokio::test]
async fn bot_never_supervises_itself() {
    let tmp = TempDir::new().unwrap();
    let p = plugin(&tmp, Arc::new(ManualClock::new(T0)), ReactionWeights::default());

    let mut ev = msg("1", "监督 5");
    ev.mentions = vec![BOT.to_string()];
    assert_eq!(text(p.handle(&ev).await), "请 @ 要监督的对象");
    assert!(!p.is_supervising(BOT));
}

#[tokio::test]
async fn supervised_user_gets_one_reaction_per_message() {
    let tmp = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(T0));
    let p = plugin(&tmp, clock, ReactionWeights::default());

    let images = tmp.path().join("image");
    fs::create_dir_all(&images).unwrap();
    fs::write(images.join("a.jpg"), b"jpg").unwrap();

    text(p.handle(&msg("1", "监督 @42")).await);
    for _ in 0..20 {
        match p.handle(&msg("42", "又来摸鱼")).await {
            Some(Response::MentionImage { user_id, image }) => {
                assert_eq!(user_id, "42");
                assert_eq!(image, images.join("a.jpg"));
            }
            Some(Response::Text(t)) => assert_eq!(t, " [echo] 他来水群了：又来摸鱼"),
            Some(Response::Poke { user_id, group_id }) => {
                assert_eq!(user_id, "42");
                assert_eq!(group_id, "123456");
            }
            None => panic!("every branch has a working backend here"),
        }
    }

    // Others are left alone.
    assert!(p.handle(&msg("43", "hi")).await.is_none());
}
