/**
 * HUB - État partagé du relais temps réel
 *
 * RÔLE :
 * Assemble les composants du coeur (stockage, sessions, canaux, agrégation,
 * planificateur, reconciler, dispatcher) en un seul état clonable, passé
 * tel quel à Axum et aux tâches de connexion.
 *
 * ARCHITECTURE :
 * Chaque composant porte son propre verrou interne ; le Hub n'ajoute aucune
 * sérialisation globale.
 */

use crate::aggregation::AggregationReader;
use crate::broadcast::BroadcastScheduler;
use crate::channels::{ChannelSet, Frame};
use crate::config::HubConfig;
use crate::dispatch::TargetedDispatcher;
use crate::health::{HealthInputs, HealthTracker, HubHealth};
use crate::reconciler::ReportReconciler;
use crate::sessions::SessionRegistry;
use crate::store::{SharedStore, StoreHandle};

#[derive(Clone)]
pub struct Hub {
    pub(crate) store: StoreHandle,
    pub(crate) sessions: SessionRegistry,
    pub(crate) channels: ChannelSet,
    pub(crate) reader: AggregationReader,
    pub(crate) scheduler: BroadcastScheduler,
    pub(crate) reconciler: ReportReconciler,
    pub(crate) dispatcher: TargetedDispatcher,
    health: HealthTracker,
    channel_buffer: usize,
}

impl Hub {
    pub fn new(store: SharedStore, cfg: &HubConfig) -> Self {
        let store = StoreHandle::new(store);
        let sessions = SessionRegistry::new();
        let channels = ChannelSet::new();
        let reader = AggregationReader::new(store.clone(), channels.clone(), cfg.plants.clone());
        let scheduler = BroadcastScheduler::new(reader.clone(), cfg.poll_interval());

        Self {
            reconciler: ReportReconciler::new(store.clone()),
            dispatcher: TargetedDispatcher::new(store.clone(), sessions.clone(), channels.clone()),
            store,
            sessions,
            channels,
            reader,
            scheduler,
            health: HealthTracker::new(),
            channel_buffer: cfg.channel_buffer.max(1),
        }
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    pub fn reader(&self) -> &AggregationReader {
        &self.reader
    }

    pub fn scheduler(&self) -> &BroadcastScheduler {
        &self.scheduler
    }

    pub fn channel_buffer(&self) -> usize {
        self.channel_buffer
    }

    /// Demande à tous les canaux d'émettre un rapport immédiatement
    pub fn force_all(&self) -> usize {
        let reached = self.channels.broadcast(&Frame::force_report());
        log::info!("[hub] force-report sent to {} channel(s)", reached);
        reached
    }

    pub async fn health(&self) -> HubHealth {
        let agents_stored = match self.store.list_agents().await {
            Ok(agents) => Some(agents.len()),
            Err(e) => {
                log::warn!("[hub] health could not count agents: {}", e);
                None
            }
        };

        self.health.get_health(HealthInputs {
            channels_online: self.channels.len(),
            sessions_tracked: self.sessions.len(),
            scheduler: self.scheduler.phase(),
            ticks_completed: self.scheduler.ticks_completed(),
            plants_tracked: self.reader.plants().len(),
            agents_stored,
        })
    }
}
