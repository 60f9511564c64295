/**
 * AGGREGATION - Lecture des vues par usine et diffusion sur `data:<usine>`
 *
 * RÔLE :
 * Interroge le stockage pour chaque usine suivie et pousse les lignes aux canaux,
 * soit vers un seul canal (rattrapage à la connexion), soit vers tous (tick).
 *
 * FONCTIONNEMENT :
 * - Une requête par usine, lancées en parallèle
 * - L'échec d'une usine est journalisé et n'empêche pas les autres
 * - Si plus aucun canal n'est ouvert au retour de la requête, le résultat est jeté
 */

use crate::channels::{ChannelId, ChannelSet, Frame, SendOutcome};
use crate::models::PlantAggregateRow;
use crate::store::{StoreError, StoreHandle};
use std::sync::Arc;
use tokio::task::JoinSet;

/// Bilan d'un tick de diffusion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub delivered: Vec<String>,
    pub failed: Vec<String>,
    pub discarded: Vec<String>,
}

#[derive(Clone)]
pub struct AggregationReader {
    store: StoreHandle,
    channels: ChannelSet,
    plants: Arc<[String]>,
}

impl AggregationReader {
    pub fn new(store: StoreHandle, channels: ChannelSet, plants: Vec<String>) -> Self {
        Self { store, channels, plants: plants.into() }
    }

    pub fn plants(&self) -> &[String] {
        &self.plants
    }

    pub async fn read(&self, plant_name: &str) -> Result<Vec<PlantAggregateRow>, StoreError> {
        self.store.read_plant_aggregate(plant_name).await
    }

    /// Rattrapage initial : une tâche indépendante par usine vers ce seul canal
    pub fn send_snapshot(&self, channel: ChannelId) -> JoinSet<()> {
        let mut tasks = JoinSet::new();
        for plant in self.plants.iter().cloned() {
            let reader = self.clone();
            tasks.spawn(async move {
                match reader.read(&plant).await {
                    Ok(rows) => {
                        if reader.channels.send_to(channel, Frame::plant_data(&plant, &rows))
                            == SendOutcome::Gone
                        {
                            log::debug!("[aggregation] {} left before snapshot of {}", channel, plant);
                        }
                    }
                    Err(e) => log::error!("[aggregation] snapshot of {} for {} failed: {}", plant, channel, e),
                }
            });
        }
        tasks
    }

    /// Un tick complet : toutes les usines interrogées, chacune diffusée à tous les canaux
    pub async fn broadcast_tick(&self) -> TickSummary {
        let mut tasks = JoinSet::new();
        for plant in self.plants.iter().cloned() {
            let reader = self.clone();
            tasks.spawn(async move {
                let result = reader.read(&plant).await;
                (plant, result)
            });
        }

        let mut summary = TickSummary::default();
        while let Some(joined) = tasks.join_next().await {
            let (plant, result) = match joined {
                Ok(done) => done,
                Err(e) => {
                    log::error!("[aggregation] plant query task aborted: {}", e);
                    continue;
                }
            };

            match result {
                Ok(rows) if self.channels.is_empty() => {
                    log::debug!("[aggregation] no channel left, discarding {} ({} rows)", plant, rows.len());
                    summary.discarded.push(plant);
                }
                Ok(rows) => {
                    self.channels.broadcast(&Frame::plant_data(&plant, &rows));
                    summary.delivered.push(plant);
                }
                Err(e) => {
                    log::error!("[aggregation] poll of {} failed: {}", plant, e);
                    summary.failed.push(plant);
                }
            }
        }
        summary
    }
}
