//! The periodic gossip loop.
//!
//! A single long-lived task wakes up every [`GossipConfig::period`] and
//! pushes the node's whole value set to each neighbor. It never waits for
//! acknowledgments; whatever a round loses, the next round resends.
//!
//! [`GossipConfig::period`]: crate::engine::GossipConfig::period

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::engine::GossipEngine;
use crate::error::{Result, SyncError};
use crate::transport::Transport;

/// Summary of one gossip round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GossipRound {
    /// Neighbors known at the start of the round.
    pub neighbors: usize,
    /// Values in the pushed snapshot.
    pub values: usize,
    /// Sends the transport rejected.
    pub failed: usize,
}

/// Handle to a running gossip loop.
pub struct GossipTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl GossipTask {
    /// Spawn the gossip loop for `engine` on the current runtime.
    ///
    /// The first round runs one period after spawning.
    pub fn spawn<T>(engine: Arc<GossipEngine<T>>) -> Self
    where
        T: Transport + 'static,
    {
        let (shutdown, signal) = watch::channel(false);
        let handle = tokio::spawn(run(engine, signal));
        Self { shutdown, handle }
    }

    /// Whether the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the loop and wait for the in-flight round to finish.
    pub async fn shutdown(self) -> Result<()> {
        // The receiver is gone if the loop already exited.
        let _ = self.shutdown.send(true);
        self.handle
            .await
            .map_err(|e| SyncError::TaskFailed(format!("gossip task: {}", e)))
    }
}

async fn run<T: Transport>(engine: Arc<GossipEngine<T>>, mut shutdown: watch::Receiver<bool>) {
    let period = engine.config().period;
    let start = tokio::time::Instant::now() + period;
    let mut ticker = tokio::time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(node = %engine.node_id(), ?period, "gossip loop started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match engine.gossip_once().await {
                    Ok(round) => tracing::trace!(node = %engine.node_id(), ?round, "gossip round"),
                    Err(e) => tracing::warn!(node = %engine.node_id(), "gossip round failed: {}", e),
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    tracing::info!(node = %engine.node_id(), "gossip loop stopped");
}
