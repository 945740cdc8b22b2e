//! Node configuration.

use std::time::Duration;

use murmur_sync::GossipConfig;

use crate::error::Result;

/// Configuration for a node.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    /// Gossip configuration.
    pub gossip: GossipConfig,
}

impl NodeConfig {
    /// Set the interval between gossip rounds.
    pub fn with_gossip_period(mut self, period: Duration) -> Self {
        self.gossip.period = period;
        self
    }

    /// Check the config is usable.
    pub fn validate(&self) -> Result<()> {
        self.gossip.validate()?;
        Ok(())
    }
}
