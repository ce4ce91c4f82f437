//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory
//! (or the path given with `-f`), then applies `SUPERVISE_WORK_DIR` and
//! `SUPERVISE_LOG_LEVEL` env overrides. Secrets (`LLM_API_KEY`,
//! `TELEGRAM_BOT_TOKEN`) are only ever read from the environment.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;
use crate::supervision::reaction::ReactionWeights;

/// Fallback system prompt for the scolding reaction.
pub const DEFAULT_SUPERVISOR_PROMPT: &str = "你是一个严格但幽默的群监工";

/// Fallback supervision length when a command carries no minutes.
pub const DEFAULT_MINUTE: u32 = 10;

/// Console channel configuration.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    pub enabled: bool,
    /// Id the bot answers to on the console; mentions of it are ignored.
    pub self_id: String,
    /// Group id every non-private console line is attributed to.
    pub group_id: String,
}

/// Telegram channel configuration.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Whether the Telegram channel is explicitly enabled.
    pub enabled: bool,
}

/// Comms subsystem configuration.
#[derive(Debug, Clone)]
pub struct CommsConfig {
    pub pty: PtyConfig,
    pub telegram: TelegramConfig,
}

/// OpenAI / OpenAI-compatible provider configuration.
/// Populated from `[llm.openai]` in the TOML.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    /// Model name passed in the request body.
    pub model: String,
    /// Sampling temperature (ignored for models that forbid it).
    pub temperature: f32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// LLM configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Which provider is active (`"dummy"` or `"openai"`).
    /// Maps to `default` in `[llm]` TOML.
    pub provider: String,
    pub openai: OpenAiConfig,
}

/// Settings consumed by the supervision plugin (`[supervision]`).
#[derive(Debug, Clone)]
pub struct SupervisionConfig {
    /// Minutes applied when `监督` carries no explicit duration.
    pub default_minute: u32,
    /// System prompt for the scolding reaction.
    pub supervisor_prompt: String,
    /// Meme pool directory (already resolved against `work_dir`).
    pub image_dir: PathBuf,
    /// JSON file holding the persisted `user_id -> expires_at` map.
    pub state_file: PathBuf,
    pub reactions: ReactionWeights,
}

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_name: String,
    /// Working directory for all persistent data (already expanded, no `~`).
    pub work_dir: PathBuf,
    pub log_level: String,
    pub supervision: SupervisionConfig,
    pub comms: CommsConfig,
    pub llm: LlmConfig,
    /// API key from `LLM_API_KEY` env var: `None` for keyless local models.
    /// Never sourced from TOML.
    pub llm_api_key: Option<String>,
}

impl Config {
    /// Returns `true` if the console channel should be loaded.
    pub fn comms_pty_should_load(&self) -> bool {
        self.comms.pty.enabled
    }

    /// Returns `true` if the Telegram channel should be loaded.
    pub fn comms_telegram_should_load(&self) -> bool {
        self.comms.telegram.enabled
    }
}

/// Raw TOML shape: `serde` target before resolution.
#[derive(Deserialize)]
struct RawConfig {
    bot: RawBot,
    #[serde(default)]
    supervision: RawSupervision,
    #[serde(default)]
    comms: RawComms,
    #[serde(default)]
    llm: RawLlm,
}

#[derive(Deserialize)]
struct RawBot {
    name: String,
    work_dir: String,
    log_level: String,
}

#[derive(Deserialize)]
struct RawSupervision {
    #[serde(default = "default_minute")]
    default_minute: u32,
    #[serde(default = "default_supervisor_prompt")]
    supervisor_prompt: String,
    #[serde(default = "default_image_dir")]
    image_dir: String,
    #[serde(default = "default_state_file")]
    state_file: String,
    #[serde(default)]
    reactions: RawReactions,
}

impl Default for RawSupervision {
    fn default() -> Self {
        Self {
            default_minute: default_minute(),
            supervisor_prompt: default_supervisor_prompt(),
            image_dir: default_image_dir(),
            state_file: default_state_file(),
            reactions: RawReactions::default(),
        }
    }
}

#[derive(Deserialize)]
struct RawReactions {
    #[serde(default = "default_image_weight")]
    image: f64,
    #[serde(default = "default_scold_weight")]
    scold: f64,
    #[serde(default = "default_poke_weight")]
    poke: f64,
}

impl Default for RawReactions {
    fn default() -> Self {
        Self {
            image: default_image_weight(),
            scold: default_scold_weight(),
            poke: default_poke_weight(),
        }
    }
}

fn default_minute() -> u32 { DEFAULT_MINUTE }
fn default_supervisor_prompt() -> String { DEFAULT_SUPERVISOR_PROMPT.to_string() }
fn default_image_dir() -> String { "image".to_string() }
fn default_state_file() -> String { "supervisors.json".to_string() }
fn default_image_weight() -> f64 { 0.4 }
fn default_scold_weight() -> f64 { 0.4 }
fn default_poke_weight() -> f64 { 0.2 }

#[derive(Deserialize, Default)]
struct RawComms {
    #[serde(default)]
    pty: RawPty,
    #[serde(default)]
    telegram: RawTelegram,
}

#[derive(Deserialize)]
struct RawPty {
    /// Defaults to `true`: the console is the zero-setup channel.
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default = "default_pty_self_id")]
    self_id: String,
    #[serde(default = "default_pty_group_id")]
    group_id: String,
}

impl Default for RawPty {
    fn default() -> Self {
        Self {
            enabled: true,
            self_id: default_pty_self_id(),
            group_id: default_pty_group_id(),
        }
    }
}

fn default_pty_self_id() -> String { "0".to_string() }
fn default_pty_group_id() -> String { "console".to_string() }

#[derive(Deserialize, Default)]
struct RawTelegram {
    /// Defaults to `false`: Telegram must be explicitly enabled.
    #[serde(default)]
    enabled: bool,
}

#[derive(Deserialize)]
struct RawLlm {
    /// Maps to `default = "..."` in `[llm]`.
    #[serde(rename = "default", default = "default_llm_provider")]
    provider: String,
    #[serde(default)]
    openai: RawOpenAiConfig,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self { provider: default_llm_provider(), openai: RawOpenAiConfig::default() }
    }
}

#[derive(Deserialize)]
struct RawOpenAiConfig {
    #[serde(default = "default_openai_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_openai_model")]
    model: String,
    #[serde(default = "default_openai_temperature")]
    temperature: f32,
    #[serde(default = "default_openai_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawOpenAiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_openai_api_base_url(),
            model: default_openai_model(),
            temperature: default_openai_temperature(),
            timeout_seconds: default_openai_timeout_seconds(),
        }
    }
}

fn default_llm_provider() -> String { "dummy".to_string() }
fn default_openai_api_base_url() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_openai_model() -> String { "gpt-4o-mini".to_string() }
fn default_openai_temperature() -> f32 { 0.7 }
fn default_openai_timeout_seconds() -> u64 { 60 }

fn default_true() -> bool {
    true
}

/// Load config from `path` (default `config/default.toml`), then apply
/// env-var overrides.
pub fn load(path: Option<&str>) -> Result<Config, AppError> {
    let work_dir_override = env::var("SUPERVISE_WORK_DIR").ok();
    let log_level_override = env::var("SUPERVISE_LOG_LEVEL").ok();
    let mut config = load_from(
        Path::new(path.unwrap_or("config/default.toml")),
        work_dir_override.as_deref(),
        log_level_override.as_deref(),
    )?;
    config.llm_api_key = env::var("LLM_API_KEY").ok();
    Ok(config)
}

/// Internal loader: accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(
    path: &Path,
    work_dir_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let b = parsed.bot;
    let work_dir = expand_home(work_dir_override.unwrap_or(&b.work_dir));
    let log_level = log_level_override.unwrap_or(&b.log_level).to_string();

    let s = parsed.supervision;
    let reactions = ReactionWeights::new(s.reactions.image, s.reactions.scold, s.reactions.poke)
        .map_err(|e| AppError::Config(format!("[supervision.reactions]: {e}")))?;

    Ok(Config {
        bot_name: b.name,
        supervision: SupervisionConfig {
            default_minute: s.default_minute,
            supervisor_prompt: s.supervisor_prompt,
            image_dir: resolve_under(&work_dir, &s.image_dir),
            state_file: resolve_under(&work_dir, &s.state_file),
            reactions,
        },
        work_dir,
        log_level,
        comms: CommsConfig {
            pty: PtyConfig {
                enabled: parsed.comms.pty.enabled,
                self_id: parsed.comms.pty.self_id,
                group_id: parsed.comms.pty.group_id,
            },
            telegram: TelegramConfig {
                enabled: parsed.comms.telegram.enabled,
            },
        },
        llm: LlmConfig {
            provider: parsed.llm.provider,
            openai: OpenAiConfig {
                api_base_url: parsed.llm.openai.api_base_url,
                model: parsed.llm.openai.model,
                temperature: parsed.llm.openai.temperature,
                timeout_seconds: parsed.llm.openai.timeout_seconds,
            },
        },
        llm_api_key: None,
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// `path` as-is when absolute (after `~` expansion), otherwise joined onto `base`.
fn resolve_under(base: &Path, path: &str) -> PathBuf {
    let p = expand_home(path);
    if p.is_absolute() { p } else { base.join(p) }
}

// ── test helpers ──────────────────────────────────────────────────────────────

impl Config {
    /// Safe `Config` for tests: dummy LLM, no API keys, all paths under `work_dir`.
    pub fn test_default(work_dir: &Path) -> Self {
        Self {
            bot_name: "test".into(),
            work_dir: work_dir.to_path_buf(),
            log_level: "info".into(),
            supervision: SupervisionConfig {
                default_minute: DEFAULT_MINUTE,
                supervisor_prompt: DEFAULT_SUPERVISOR_PROMPT.into(),
                image_dir: work_dir.join("image"),
                state_file: work_dir.join("supervisors.json"),
                reactions: ReactionWeights::default(),
            },
            comms: CommsConfig {
                pty: PtyConfig {
                    enabled: true,
                    self_id: default_pty_self_id(),
                    group_id: default_pty_group_id(),
                },
                telegram: TelegramConfig { enabled: false },
            },
            llm: LlmConfig {
                provider: "dummy".into(),
                openai: OpenAiConfig {
                    api_base_url: "http://localhost:0/v1/chat/completions".into(),
                    model: "test-model".into(),
                    temperature: 0.0,
                    timeout_seconds: 1,
                },
            },
            llm_api_key: None,
        }
    }
}
