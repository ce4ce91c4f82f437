//! supervise-bot entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Resolve effective log level (CLI `-v` flags > env > config > `RUST_LOG`)
//!   4. Init logger once
//!   5. Build the LLM provider and restore supervision state
//!   6. Spawn Ctrl-C → shutdown signal watcher
//!   7. Run comms channels until shutdown or EOF

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use supervise_bot::config::{self, Config};
use supervise_bot::error::AppError;
use supervise_bot::llm::providers;
use supervise_bot::logger;
use supervise_bot::subsystems;
use supervise_bot::supervision::{JsonFileStore, SupervisionTracker, SupervisorPlugin, SystemClock};

struct CliArgs {
    log_level: Option<&'static str>,
    config_path: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present, ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let config = config::load(args.config_path.as_deref())?;

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    logger::init(effective_log_level)?;

    info!(
        bot_name = %config.bot_name,
        work_dir = %config.work_dir.display(),
        configured_log_level = %config.log_level,
        effective_log_level = %effective_log_level,
        "config loaded"
    );

    let llm = providers::build(&config.llm, config.llm_api_key.clone())
        .map_err(|e| AppError::Config(e.to_string()))?;

    let store = JsonFileStore::new(&config.supervision.state_file);
    let tracker = SupervisionTracker::load(Box::new(store), Arc::new(SystemClock))?;
    let plugin = Arc::new(SupervisorPlugin::new(config.supervision.clone(), tracker, llm));

    // Shared shutdown token, Ctrl-C cancels it, all channels watch it.
    let shutdown = CancellationToken::new();

    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    print_startup_summary(&config);

    let comms = subsystems::comms::start(&config, plugin, shutdown.clone());
    comms.join().await?;

    // If comms exited due to EOF (not Ctrl-C), still signal everything to stop.
    shutdown.cancel();
    info!("supervise-bot stopped");

    Ok(())
}

fn print_startup_summary(config: &Config) {
    let s = &config.supervision;
    info!(
        llm_provider = %config.llm.provider,
        default_minute = s.default_minute,
        image_dir = %s.image_dir.display(),
        state_file = %s.state_file.display(),
        reactions = ?s.reactions,
        pty = config.comms_pty_should_load(),
        telegram = config.comms_telegram_should_load(),
        "supervision plugin ready"
    );
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut config_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: supervise-bot [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                std::process::exit(0);
            }
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            _ => {}
        }
    }

    // Each -v raises verbosity one tier:
    //   -v      → warn
    //   -vv     → info
    //   -vvv    → debug  (command parsing, reaction draws)
    //   -vvvv+  → trace  (full LLM payload dumps)
    let log_level = match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    };

    CliArgs { log_level, config_path }
}
