//! Keeps the process alive until it is killed internally or terminated externally

use futures::channel::mpsc::{channel, Receiver, Sender};
use futures::{SinkExt, StreamExt};
use std::fmt;
use tokio::signal::ctrl_c;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, error, warn};

/// Reason why the heart stopped beating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeathReason {
    /// A [`HeartStone`] has been used to stop the heart
    Killed(String),
    /// SIGTERM or SIGINT has been received
    Terminated,
}

impl fmt::Display for DeathReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeathReason::Killed(reason) => write!(f, "Killed ({})", reason),
            DeathReason::Terminated => write!(f, "Terminated due to external signal"),
        }
    }
}

/// Lifecycle handle of a running node
pub struct Heart {
    rx: Receiver<String>,
}

impl Heart {
    /// Creates a new heart and a linked stone that can kill it
    pub fn new() -> (Self, HeartStone) {
        let (tx, rx) = channel(1);
        (Self { rx }, HeartStone { remote: tx })
    }

    /// Creates a new heart that can only be stopped by an external signal
    pub fn without_heart_stone() -> Self {
        Self::new().0
    }

    /// Waits until the heart dies and returns why
    pub async fn death(&mut self) -> DeathReason {
        debug!("Heart starts beating");

        tokio::select! {
            Some(reason) = self.rx.next() => DeathReason::Killed(reason),
            _ = termination_signal() => DeathReason::Terminated,
        }
    }
}

async fn termination_signal() {
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = sigterm.recv() => {},
                _ = ctrl_c() => {},
            }
        }
        Err(e) => {
            warn!(error = ?e, "Unable to listen for SIGTERM, only reacting to SIGINT");
            ctrl_c().await.ok();
        }
    }
}

/// Remote control for a [`Heart`]
#[derive(Clone)]
pub struct HeartStone {
    remote: Sender<String>,
}

impl HeartStone {
    /// Stops the linked heart for the given reason
    pub async fn kill(&mut self, reason: String) {
        if let Err(e) = self.remote.send(reason).await {
            error!(error = ?e, "Failed to kill heart");
        }
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use futures::poll;
    use std::time::Duration;
    use tokio::task::{spawn, yield_now};
    use tokio::time::sleep;

    #[tokio::test]
    async fn keep_beating_without_interaction() {
        let (mut heart, _stone) = Heart::new();

        let handle = spawn(async move { heart.death().await });
        sleep(Duration::from_millis(50)).await;
        yield_now().await;

        assert!(!poll!(handle).is_ready());
    }

    #[tokio::test]
    async fn die_when_killed() {
        let (mut heart, mut stone) = Heart::new();

        let handle = spawn(async move { heart.death().await });
        stone.kill("shutdown requested".to_owned()).await;

        assert_eq!(
            handle.await.unwrap(),
            DeathReason::Killed("shutdown requested".to_owned())
        );
    }

    #[tokio::test]
    async fn outlive_dropped_stones() {
        let (mut heart, stone) = Heart::new();
        drop(stone);

        let handle = spawn(async move { heart.death().await });
        sleep(Duration::from_millis(50)).await;
        yield_now().await;

        assert!(!poll!(handle).is_ready());
    }
}
