//! Comms subsystem: the chat channels that feed the plugin.
//!
//! Each channel (console, Telegram) implements [`Channel`] and runs as its
//! own task under [`start`]. Channels capture a shared [`Arc<CommsState>`]
//! at construction time and report lifecycle events back over an [`mpsc`]
//! channel drained by a small manager task.

#[cfg(feature = "channel-pty")]
pub mod pty;
mod state;
#[cfg(feature = "channel-telegram")]
pub mod telegram;

pub use state::{CommsEvent, CommsState};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::supervision::SupervisorPlugin;

/// Run-loop future of one channel.
pub type ChannelFuture = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'static>>;

/// A chat channel. `run` is called once and should return when `shutdown`
/// fires or its input source closes.
pub trait Channel: Send + 'static {
    fn id(&self) -> &str;

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ChannelFuture;
}

/// Handle to the running channel set.
pub struct CommsHandle {
    task: JoinHandle<Result<(), AppError>>,
}

impl CommsHandle {
    /// Wait for every channel to exit; yields the first channel error.
    pub async fn join(self) -> Result<(), AppError> {
        self.task
            .await
            .map_err(|e| AppError::Comms(format!("comms supervisor task failed: {e}")))?
    }
}

/// Spawn all configured channels.
///
/// A channel that fails or panics cancels `shutdown`, which stops the rest.
/// The handle resolves once all channels have exited.
pub fn start(config: &Config, plugin: Arc<SupervisorPlugin>, shutdown: CancellationToken) -> CommsHandle {
    let (event_tx, event_rx) = mpsc::channel::<CommsEvent>(32);
    let state = Arc::new(CommsState::new(plugin, event_tx));

    #[allow(unused_mut)]
    let mut channels: Vec<Box<dyn Channel>> = Vec::new();

    #[cfg(feature = "channel-pty")]
    if config.comms_pty_should_load() {
        channels.push(Box::new(pty::PtyChannel::new(
            "pty0",
            config.comms.pty.self_id.clone(),
            config.comms.pty.group_id.clone(),
            state.clone(),
        )));
    }

    #[cfg(feature = "channel-telegram")]
    if config.comms_telegram_should_load() {
        channels.push(Box::new(telegram::TelegramChannel::new("telegram0", state.clone())));
    }

    #[cfg(not(feature = "channel-telegram"))]
    if config.comms_telegram_should_load() {
        warn!("telegram enabled in config but built without the `channel-telegram` feature");
    }

    if channels.is_empty() {
        warn!("no comms channels configured, nothing will reach the plugin");
    }

    info!(channels = channels.len(), "comms subsystem starting");

    // Drop our copy so the manager exits once every channel is gone.
    drop(state);
    tokio::spawn(run_manager(event_rx));

    spawn_channels(channels, shutdown)
}

/// Run each channel on its own task, tagged with its id.
pub fn spawn_channels(channels: Vec<Box<dyn Channel>>, shutdown: CancellationToken) -> CommsHandle {
    let task = tokio::spawn(async move {
        let mut set = JoinSet::new();
        for channel in channels {
            let id = channel.id().to_string();
            let run = channel.run(shutdown.clone());
            debug!(channel_id = %id, "spawning channel");
            set.spawn(async move { (id, run.await) });
        }

        let mut first_err = None;
        while let Some(joined) = set.join_next().await {
            let err = match joined {
                Ok((_, Ok(()))) => continue,
                Ok((channel_id, Err(e))) => {
                    error!(%channel_id, "channel failed: {e}");
                    e
                }
                Err(e) => {
                    error!("channel task panicked: {e}");
                    AppError::Comms(format!("channel panicked: {e}"))
                }
            };
            shutdown.cancel();
            first_err.get_or_insert(err);
        }

        first_err.map_or(Ok(()), Err)
    });

    CommsHandle { task }
}

async fn run_manager(mut event_rx: mpsc::Receiver<CommsEvent>) {
    while let Some(event) = event_rx.recv().await {
        match event {
            CommsEvent::ChannelReady { channel_id } => info!(%channel_id, "channel ready"),
            CommsEvent::ChannelShutdown { channel_id } => info!(%channel_id, "channel shut down"),
        }
    }
    debug!("comms manager exiting, all channels dropped");
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scripted {
        id: &'static str,
        fail: bool,
    }

    impl Channel for Scripted {
        fn id(&self) -> &str {
            self.id
        }

        fn run(self: Box<Self>, shutdown: CancellationToken) -> ChannelFuture {
            Box::pin(async move {
                if self.fail {
                    return Err(AppError::Comms(format!("{} lost connection", self.id)));
                }
                shutdown.cancelled().await;
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn channels_stop_on_shutdown() {
        let shutdown = CancellationToken::new();
        let handle = spawn_channels(
            vec![Box::new(Scripted { id: "pty0", fail: false }), Box::new(Scripted { id: "tg0", fail: false })],
            shutdown.clone(),
        );
        shutdown.cancel();
        assert!(handle.join().await.is_ok());
    }

    #[tokio::test]
    async fn failed_channel_stops_the_others() {
        let shutdown = CancellationToken::new();
        let handle = spawn_channels(
            vec![Box::new(Scripted { id: "pty0", fail: false }), Box::new(Scripted { id: "tg0", fail: true })],
            shutdown.clone(),
        );
        let err = handle.join().await.unwrap_err();
        assert!(err.to_string().contains("tg0 lost connection"));
        assert!(shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn empty_channel_set_joins_immediately() {
        let handle = spawn_channels(Vec::new(), CancellationToken::new());
        assert!(handle.join().await.is_ok());
    }
}
