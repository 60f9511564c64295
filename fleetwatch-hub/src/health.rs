use crate::broadcast::SchedulerPhase;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HubHealth {
    pub uptime_seconds: u64,
    pub channels_online: u32,
    pub sessions_tracked: u32,
    pub scheduler: String,
    pub ticks_completed: u64,
    pub plants_tracked: u32,
    /// None si le stockage n'a pas répondu
    pub agents_stored: Option<u32>,
}

/// Compteurs bruts relevés par le hub au moment de la requête
pub struct HealthInputs {
    pub channels_online: usize,
    pub sessions_tracked: usize,
    pub scheduler: SchedulerPhase,
    pub ticks_completed: u64,
    pub plants_tracked: usize,
    pub agents_stored: Option<usize>,
}

#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self { start_time: Instant::now() }
    }

    pub fn get_health(&self, inputs: HealthInputs) -> HubHealth {
        HubHealth {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            channels_online: inputs.channels_online as u32,
            sessions_tracked: inputs.sessions_tracked as u32,
            scheduler: match inputs.scheduler {
                SchedulerPhase::Idle => "idle".to_string(),
                SchedulerPhase::Active => "active".to_string(),
            },
            ticks_completed: inputs.ticks_completed,
            plants_tracked: inputs.plants_tracked as u32,
            agents_stored: inputs.agents_stored.map(|n| n as u32),
        }
    }
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new()
    }
}
