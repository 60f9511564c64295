/*!
Stockage instable pour tests de résilience

Enveloppe un JsonFleetStore en mémoire et fait échouer à la demande les
lectures d'agrégat de certaines usines, ou toutes les écritures.
*/

use fleetwatch_hub::models::{AgentReport, LineDirectoryEntry, PlantAggregateRow};
use fleetwatch_hub::store::{Directory, FleetStore, JsonFleetStore, StoreError, UpsertOutcome};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

pub struct FlakyStore {
    inner: JsonFleetStore,
    failing_plants: Mutex<HashSet<String>>,
    writes_fail: AtomicBool,
    reads: Mutex<HashMap<String, usize>>,
}

impl FlakyStore {
    pub fn new(directory: Directory) -> Self {
        Self {
            inner: JsonFleetStore::in_memory(directory),
            failing_plants: Mutex::new(HashSet::new()),
            writes_fail: AtomicBool::new(false),
            reads: Mutex::new(HashMap::new()),
        }
    }

    /// Les lectures d'agrégat de cette usine échoueront
    pub fn fail_plant(&self, plant_name: &str) {
        self.failing_plants.lock().insert(plant_name.to_string());
    }

    pub fn heal_plant(&self, plant_name: &str) {
        self.failing_plants.lock().remove(plant_name);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.writes_fail.store(fail, Ordering::SeqCst);
    }

    /// Nombre de lectures d'agrégat tentées pour une usine
    pub fn reads_of(&self, plant_name: &str) -> usize {
        self.reads.lock().get(plant_name).copied().unwrap_or(0)
    }

    fn check_writes(&self) -> Result<(), StoreError> {
        if self.writes_fail.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        Ok(())
    }
}

impl FleetStore for FlakyStore {
    fn read_plant_aggregate(&self, plant_name: &str) -> Result<Vec<PlantAggregateRow>, StoreError> {
        *self.reads.lock().entry(plant_name.to_string()).or_insert(0) += 1;
        if self.failing_plants.lock().contains(plant_name) {
            log::debug!("💥 [STUB] failing aggregate read for {}", plant_name);
            return Err(StoreError::Unavailable(format!("{plant_name} is offline")));
        }
        self.inner.read_plant_aggregate(plant_name)
    }

    fn upsert_agent(&self, report: &AgentReport) -> Result<UpsertOutcome, StoreError> {
        self.check_writes()?;
        self.inner.upsert_agent(report)
    }

    fn zero_agent_progress(&self, network_address: &str) -> Result<bool, StoreError> {
        self.check_writes()?;
        self.inner.zero_agent_progress(network_address)
    }

    fn find_line_entry(&self, identifier: &str) -> Result<Option<LineDirectoryEntry>, StoreError> {
        self.inner.find_line_entry(identifier)
    }

    fn reset_report_counts(&self) -> Result<usize, StoreError> {
        self.check_writes()?;
        self.inner.reset_report_counts()
    }

    fn list_agents(&self) -> Result<Vec<AgentReport>, StoreError> {
        self.inner.list_agents()
    }
}
