/**
 * STORE - Contrat de persistance du hub Fleetwatch
 *
 * RÔLE :
 * Ce module définit le contrat étroit entre le coeur temps réel et le stockage
 * durable : agrégat par usine, upsert d'agent, remise à zéro, annuaire des lignes.
 *
 * FONCTIONNEMENT :
 * - FleetStore trait = interface synchrone que chaque backend implémente
 * - StoreHandle = façade async qui exécute chaque appel sur le pool bloquant de tokio
 * - StoreError = erreurs de lecture/écriture remontées au coeur (jamais fatales)
 *
 * UTILITÉ DANS FLEETWATCH :
 * 🎯 Les handlers de canaux n'attendent jamais une I/O disque sur leur propre thread
 * 🎯 Un backend instable peut être injecté dans les tests (voir devkit)
 */

pub mod json;

use crate::models::{AgentReport, LineDirectoryEntry, PlantAggregateRow};
use std::sync::Arc;

pub use json::{Directory, JsonFleetStore};

/// Erreurs possibles lors des opérations de stockage
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Résultat d'un upsert par identité
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Replaced,
}

/// Interface commune que tout backend de stockage doit implémenter
pub trait FleetStore: Send + Sync {
    /// Jointure agent -> ligne -> usine filtrée par nom d'usine (peut être vide)
    fn read_plant_aggregate(&self, plant_name: &str) -> Result<Vec<PlantAggregateRow>, StoreError>;

    /// Insertion ou remplacement complet, clé = adresse réseau
    fn upsert_agent(&self, report: &AgentReport) -> Result<UpsertOutcome, StoreError>;

    /// Met report_count à 0 et vide progress_detail. Retourne false si l'agent est inconnu.
    fn zero_agent_progress(&self, network_address: &str) -> Result<bool, StoreError>;

    /// Première entrée d'annuaire dont l'adresse, le code ou le nom de ligne vaut `identifier`
    fn find_line_entry(&self, identifier: &str) -> Result<Option<LineDirectoryEntry>, StoreError>;

    /// Reset quotidien des compteurs, retourne le nombre d'agents touchés
    fn reset_report_counts(&self) -> Result<usize, StoreError>;

    fn list_agents(&self) -> Result<Vec<AgentReport>, StoreError>;
}

pub type SharedStore = Arc<dyn FleetStore>;

/// Façade async sur un FleetStore : chaque appel part sur le pool bloquant
#[derive(Clone)]
pub struct StoreHandle {
    inner: SharedStore,
}

impl StoreHandle {
    pub fn new(inner: SharedStore) -> Self {
        Self { inner }
    }

    async fn run<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn FleetStore) -> Result<T, StoreError> + Send + 'static,
    {
        let store = self.inner.clone();
        tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .map_err(|e| StoreError::Unavailable(format!("storage task failed: {e}")))?
    }

    pub async fn read_plant_aggregate(&self, plant_name: &str) -> Result<Vec<PlantAggregateRow>, StoreError> {
        let plant_name = plant_name.to_string();
        self.run(move |store| store.read_plant_aggregate(&plant_name)).await
    }

    pub async fn upsert_agent(&self, report: AgentReport) -> Result<UpsertOutcome, StoreError> {
        self.run(move |store| store.upsert_agent(&report)).await
    }

    pub async fn zero_agent_progress(&self, network_address: &str) -> Result<bool, StoreError> {
        let network_address = network_address.to_string();
        self.run(move |store| store.zero_agent_progress(&network_address)).await
    }

    pub async fn find_line_entry(&self, identifier: &str) -> Result<Option<LineDirectoryEntry>, StoreError> {
        let identifier = identifier.to_string();
        self.run(move |store| store.find_line_entry(&identifier)).await
    }

    pub async fn reset_report_counts(&self) -> Result<usize, StoreError> {
        self.run(|store| store.reset_report_counts()).await
    }

    pub async fn list_agents(&self) -> Result<Vec<AgentReport>, StoreError> {
        self.run(|store| store.list_agents()).await
    }
}
