//! Command-driven front end for the engine.
//!
//! The engine runs inside a single spawned task that owns all state and
//! processes commands strictly in order. Callers talk to it through a
//! cloneable [`ServiceHandle`]; the startup pass runs before the first
//! command is accepted.

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::app::{Result, SyncError};
use crate::engine::auto_refresh::AutoRefreshTimer;
use crate::engine::events::{RefreshEvent, RefreshReason, RefreshSummary};
use crate::engine::SyncEngine;

const COMMAND_CAPACITY: usize = 16;

#[derive(Debug)]
pub enum Command {
    Refresh(RefreshReason),
    AddFeed {
        url: String,
        reply: oneshot::Sender<Result<bool>>,
    },
    DeleteFeeds(Vec<String>),
    SetRead { uid: String, read: bool },
    Shutdown,
}

pub struct SyncService {
    engine: SyncEngine,
    timer: AutoRefreshTimer,
    rx: mpsc::Receiver<Command>,
    tx: mpsc::Sender<Command>,
}

impl SyncService {
    /// Move `engine` into its own task and return a handle to it.
    pub fn spawn(engine: SyncEngine) -> (ServiceHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        let handle = ServiceHandle {
            tx: tx.clone(),
            events: engine.event_sender(),
        };
        let service = SyncService {
            engine,
            timer: AutoRefreshTimer::default(),
            rx,
            tx,
        };
        (handle, tokio::spawn(service.run()))
    }

    async fn run(mut self) {
        self.handle_refresh(RefreshReason::Startup).await;

        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                Command::Refresh(reason) => self.handle_refresh(reason).await,
                Command::AddFeed { url, reply } => {
                    let _ = reply.send(self.engine.add_feed(&url).await);
                }
                Command::DeleteFeeds(urls) => {
                    if let Err(e) = self.engine.delete_feeds(&urls) {
                        tracing::error!("failed to delete feeds: {e}");
                    }
                }
                Command::SetRead { uid, read } => {
                    self.engine.set_read(&uid, read);
                }
                Command::Shutdown => break,
            }
        }

        self.timer.disarm();
        if let Err(e) = self.engine.shutdown() {
            tracing::error!("shutdown save failed: {e}");
        }
    }

    async fn handle_refresh(&mut self, reason: RefreshReason) {
        // Any pending countdown is superseded; this cycle re-arms it.
        self.timer.disarm();
        self.engine.refresh(reason).await;
        if self.engine.config().refresh.auto_refresh_enabled {
            self.timer
                .arm(self.engine.config().auto_refresh_interval(), self.tx.clone());
        }
    }
}

/// Cloneable handle to a running [`SyncService`].
#[derive(Clone)]
pub struct ServiceHandle {
    tx: mpsc::Sender<Command>,
    events: broadcast::Sender<RefreshEvent>,
}

impl ServiceHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.events.subscribe()
    }

    pub async fn refresh(&self) -> Result<()> {
        self.send(Command::Refresh(RefreshReason::Manual)).await
    }

    pub async fn add_feed(&self, url: impl Into<String>) -> Result<bool> {
        let (reply, response) = oneshot::channel();
        self.send(Command::AddFeed {
            url: url.into(),
            reply,
        })
        .await?;
        response
            .await
            .map_err(|_| SyncError::Config("sync service stopped".to_string()))?
    }

    pub async fn delete_feeds(&self, urls: Vec<String>) -> Result<()> {
        self.send(Command::DeleteFeeds(urls)).await
    }

    pub async fn set_read(&self, uid: impl Into<String>, read: bool) -> Result<()> {
        self.send(Command::SetRead {
            uid: uid.into(),
            read,
        })
        .await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }

    async fn send(&self, cmd: Command) -> Result<()> {
        self.tx
            .send(cmd)
            .await
            .map_err(|_| SyncError::Config("sync service stopped".to_string()))
    }
}

/// Await the next end-of-cycle summary on an event stream.
pub async fn next_summary(
    events: &mut broadcast::Receiver<RefreshEvent>,
) -> Option<RefreshSummary> {
    loop {
        match events.recv().await {
            Ok(RefreshEvent::RefreshEnded { summary }) => return Some(summary),
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}
