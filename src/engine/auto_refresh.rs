//! One-shot auto-refresh timer.
//!
//! Armed after each completed cycle rather than ticking on a fixed
//! schedule, so a slow cycle never stacks refreshes. Disarming aborts the
//! pending sleep; a fired timer just enqueues a command like any other
//! caller.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::engine::events::RefreshReason;
use crate::engine::service::Command;

#[derive(Debug, Default)]
pub struct AutoRefreshTimer {
    handle: Option<JoinHandle<()>>,
}

impl AutoRefreshTimer {
    pub fn arm(&mut self, interval: Duration, tx: mpsc::Sender<Command>) {
        self.disarm();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            let _ = tx.send(Command::Refresh(RefreshReason::Auto)).await;
        }));
    }

    pub fn disarm(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for AutoRefreshTimer {
    fn drop(&mut self) {
        self.disarm();
    }
}
