/*!
Test Harness pour le hub Fleetwatch

Facilite l'écriture de scénarios bout en bout avec:
- Un Hub réel branché sur un FlakyStore en mémoire
- Des connexions enregistreuses à la place des WebSockets
- Des assertions sur l'état du stockage
*/

use crate::channel_stub::RecordingChannel;
use crate::fixtures::sample_directory;
use crate::store_stub::FlakyStore;
use anyhow::Result;
use fleetwatch_hub::models::AgentReport;
use fleetwatch_hub::store::Directory;
use fleetwatch_hub::{Connection, Hub, HubConfig};
use std::sync::Arc;
use std::time::Duration;

/// Harness complet : hub + stockage instrumenté
pub struct TestHarness {
    pub hub: Hub,
    pub store: Arc<FlakyStore>,
    buffer: usize,
}

impl TestHarness {
    /// Annuaire de démonstration, usines Plant A et Plant C, tick à 60s
    pub fn new() -> Self {
        Self::with(sample_directory(), vec!["Plant A".into(), "Plant C".into()], 60_000)
    }

    /// Harness avec un intervalle de tick court, pour observer la diffusion
    pub fn ticking(poll_interval_ms: u64) -> Self {
        Self::with(sample_directory(), vec!["Plant A".into(), "Plant C".into()], poll_interval_ms)
    }

    pub fn with(directory: Directory, plants: Vec<String>, poll_interval_ms: u64) -> Self {
        env_logger::try_init().ok(); // Init logging pour tests

        let cfg = HubConfig { plants, poll_interval_ms, ..HubConfig::default() };
        let store = Arc::new(FlakyStore::new(directory));
        let hub = Hub::new(store.clone(), &cfg);
        Self { hub, store, buffer: cfg.channel_buffer.max(1) }
    }

    /// Ouvre un canal comme le ferait le transport WebSocket
    pub fn connect(&self) -> (Connection, RecordingChannel) {
        let (tx, channel) = RecordingChannel::new(self.buffer);
        (self.hub.connect(tx), channel)
    }

    /// Agent stocké pour cette adresse
    pub async fn agent(&self, network_address: &str) -> Result<Option<AgentReport>> {
        let agents = self.hub.store().list_agents().await?;
        Ok(agents.into_iter().find(|a| a.network_address == network_address))
    }

    /// Attend qu'une condition sur un agent devienne vraie (tâches détachées)
    pub async fn wait_for_agent<F>(&self, network_address: &str, timeout_ms: u64, check: F) -> Result<AgentReport>
    where
        F: Fn(&AgentReport) -> bool,
    {
        let start = std::time::Instant::now();
        while start.elapsed() < Duration::from_millis(timeout_ms) {
            if let Some(agent) = self.agent(network_address).await? {
                if check(&agent) {
                    return Ok(agent);
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        anyhow::bail!("agent {} never reached the expected state", network_address);
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
