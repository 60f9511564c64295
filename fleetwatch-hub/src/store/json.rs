/**
 * STORE JSON - Backend fichier pour les agents et l'annuaire usine/ligne
 *
 * RÔLE :
 * Implémentation par défaut de FleetStore : annuaire chargé au démarrage,
 * table des agents en mémoire et recopiée sur disque après chaque mutation.
 *
 * FONCTIONNEMENT :
 * - directory.json = { "plants": [...], "lines": [...] } (lecture seule)
 * - agents.json = tableau des agents, ordre d'insertion conservé
 * - Un seul Mutex protège la table : l'upsert est atomique par adresse réseau
 *
 * DONNÉES EXEMPLE (directory.json) :
 * ```json
 * {
 *   "plants": [{ "plant_code": "PA", "plant_name": "Plant A" }],
 *   "lines": [{ "plant_identifier": "PA", "line_code": "L-01",
 *               "line_name": "Assembly 1", "network_address": "10.0.0.5" }]
 * }
 * ```
 */

use super::{FleetStore, StoreError, UpsertOutcome};
use crate::models::{AgentReport, LineDirectoryEntry, Plant, PlantAggregateRow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DIRECTORY_FILE: &str = "directory.json";
pub const AGENTS_FILE: &str = "agents.json";

/// Données de référence : usines et lignes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Directory {
    #[serde(default)]
    pub plants: Vec<Plant>,
    #[serde(default)]
    pub lines: Vec<LineDirectoryEntry>,
}

/// Ligne de la table agents (id = ordre d'insertion)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredAgent {
    id: u64,
    #[serde(flatten)]
    report: AgentReport,
}

pub struct JsonFleetStore {
    /// None = stockage purement mémoire (tests)
    agents_path: Option<PathBuf>,
    directory: Directory,
    agents: parking_lot::Mutex<Vec<StoredAgent>>,
}

impl JsonFleetStore {
    /// Ouvre le stockage dans `data_dir`, crée un agents.json vide si besoin
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir)?;

        let directory_path = data_dir.join(DIRECTORY_FILE);
        let directory: Directory = if directory_path.exists() {
            serde_json::from_str(&fs::read_to_string(&directory_path)?)?
        } else {
            log::warn!("[store] no {:?}, plant aggregates will be empty", directory_path);
            Directory::default()
        };

        let agents_path = data_dir.join(AGENTS_FILE);
        if !agents_path.exists() {
            fs::write(&agents_path, "[]")?;
        }
        let agents: Vec<StoredAgent> = serde_json::from_str(&fs::read_to_string(&agents_path)?)?;

        log::info!(
            "[store] opened {:?}: {} plants, {} lines, {} agents",
            data_dir,
            directory.plants.len(),
            directory.lines.len(),
            agents.len()
        );

        Ok(Self {
            agents_path: Some(agents_path),
            directory,
            agents: parking_lot::Mutex::new(agents),
        })
    }

    pub fn in_memory(directory: Directory) -> Self {
        Self {
            agents_path: None,
            directory,
            agents: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Appelé avec le verrou tenu : les écritures disque suivent l'ordre des mutations
    fn persist(&self, agents: &[StoredAgent]) -> Result<(), StoreError> {
        if let Some(path) = &self.agents_path {
            let json = serde_json::to_string_pretty(agents)?;
            fs::write(path, json)?;
        }
        Ok(())
    }

    /// Écrit `next` puis le publie sous le verrou tenu par l'appelant.
    /// Si l'écriture échoue la table en mémoire reste inchangée.
    fn commit(&self, current: &mut Vec<StoredAgent>, next: Vec<StoredAgent>) -> Result<(), StoreError> {
        self.persist(&next)?;
        *current = next;
        Ok(())
    }

    fn plant_code_for(&self, plant_name: &str) -> Vec<&str> {
        self.directory
            .plants
            .iter()
            .filter(|p| p.plant_name == plant_name)
            .map(|p| p.plant_code.as_str())
            .collect()
    }
}

impl FleetStore for JsonFleetStore {
    fn read_plant_aggregate(&self, plant_name: &str) -> Result<Vec<PlantAggregateRow>, StoreError> {
        let codes = self.plant_code_for(plant_name);
        if codes.is_empty() {
            return Ok(Vec::new());
        }

        let agents = self.agents.lock();
        let mut ordered: Vec<&StoredAgent> = agents.iter().collect();
        ordered.sort_by_key(|a| a.id);

        let rows = ordered
            .into_iter()
            .filter_map(|agent| {
                // Première ligne rattachée à l'adresse de l'agent
                let line = self
                    .directory
                    .lines
                    .iter()
                    .find(|l| l.network_address == agent.report.network_address)?;
                if !codes.contains(&line.plant_identifier.as_str()) {
                    return None;
                }
                Some(PlantAggregateRow {
                    plant_name: plant_name.to_string(),
                    line_name: line.line_name.clone(),
                    display_user: agent.report.display_user.clone(),
                    network_address: agent.report.network_address.clone(),
                    report_count: agent.report.report_count,
                    progress_detail: agent.report.progress_detail.clone(),
                    progress_timestamp: agent.report.progress_timestamp.clone(),
                })
            })
            .collect();

        Ok(rows)
    }

    fn upsert_agent(&self, report: &AgentReport) -> Result<UpsertOutcome, StoreError> {
        let mut agents = self.agents.lock();
        let mut next = agents.clone();

        let outcome = match next
            .iter_mut()
            .find(|a| a.report.network_address == report.network_address)
        {
            Some(existing) => {
                existing.report = report.clone();
                UpsertOutcome::Replaced
            }
            None => {
                let id = next.iter().map(|a| a.id).max().unwrap_or(0) + 1;
                next.push(StoredAgent { id, report: report.clone() });
                UpsertOutcome::Created
            }
        };

        self.commit(&mut agents, next)?;
        Ok(outcome)
    }

    fn zero_agent_progress(&self, network_address: &str) -> Result<bool, StoreError> {
        let mut agents = self.agents.lock();
        let Some(pos) = agents
            .iter()
            .position(|a| a.report.network_address == network_address)
        else {
            return Ok(false);
        };

        let mut next = agents.clone();
        next[pos].report.zero_progress();
        self.commit(&mut agents, next)?;
        Ok(true)
    }

    fn find_line_entry(&self, identifier: &str) -> Result<Option<LineDirectoryEntry>, StoreError> {
        Ok(self.directory.lines.iter().find(|l| l.matches(identifier)).cloned())
    }

    fn reset_report_counts(&self) -> Result<usize, StoreError> {
        let mut agents = self.agents.lock();
        let mut next = agents.clone();
        for agent in next.iter_mut() {
            agent.report.report_count = 0;
        }
        let affected = next.len();
        self.commit(&mut agents, next)?;
        Ok(affected)
    }

    fn list_agents(&self) -> Result<Vec<AgentReport>, StoreError> {
        let agents = self.agents.lock();
        let mut ordered: Vec<&StoredAgent> = agents.iter().collect();
        ordered.sort_by_key(|a| a.id);
        Ok(ordered.into_iter().map(|a| a.report.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> Directory {
        Directory {
            plants: vec![
                Plant { plant_code: "PA".into(), plant_name: "Plant A".into() },
                Plant { plant_code: "PC".into(), plant_name: "Plant C".into() },
            ],
            lines: vec![
                LineDirectoryEntry {
                    plant_identifier: "PA".into(),
                    line_code: "L-01".into(),
                    line_name: "Assembly 1".into(),
                    network_address: "10.0.0.5".into(),
                },
                LineDirectoryEntry {
                    plant_identifier: "PC".into(),
                    line_code: "L-09".into(),
                    line_name: "Packing 9".into(),
                    network_address: "10.0.0.9".into(),
                },
                LineDirectoryEntry {
                    plant_identifier: "PC".into(),
                    line_code: "L-09".into(),
                    line_name: "Packing 9 (spare)".into(),
                    network_address: "10.0.0.10".into(),
                },
            ],
        }
    }

    fn report(ip: &str, user: &str, count: u64) -> AgentReport {
        AgentReport {
            network_address: ip.into(),
            display_user: user.into(),
            user_code: None,
            report_count: count,
            progress_detail: "A | B".into(),
            progress_timestamp: "01/01/2025 10:00:00 AM".into(),
        }
    }

    #[test]
    fn upsert_creates_then_fully_replaces() {
        let store = JsonFleetStore::in_memory(directory());

        let mut first = report("10.0.0.5", "alice", 3);
        first.user_code = Some("U-1".into());
        assert_eq!(store.upsert_agent(&first).unwrap(), UpsertOutcome::Created);

        let mut second = report("10.0.0.5", "bob", 1);
        second.progress_detail = String::new();
        assert_eq!(store.upsert_agent(&second).unwrap(), UpsertOutcome::Replaced);

        let agents = store.list_agents().unwrap();
        assert_eq!(agents, vec![second]);
        assert_eq!(agents[0].user_code, None);
    }

    #[test]
    fn zero_progress_touches_only_matching_agent() {
        let store = JsonFleetStore::in_memory(directory());
        store.upsert_agent(&report("10.0.0.5", "alice", 3)).unwrap();
        store.upsert_agent(&report("10.0.0.9", "carol", 7)).unwrap();

        assert!(store.zero_agent_progress("10.0.0.5").unwrap());
        assert!(!store.zero_agent_progress("10.9.9.9").unwrap());

        let agents = store.list_agents().unwrap();
        assert_eq!(agents[0].report_count, 0);
        assert_eq!(agents[0].progress_detail, "");
        assert_eq!(agents[1].report_count, 7);
        assert_eq!(agents[1].progress_detail, "A | B");
    }

    #[test]
    fn aggregate_joins_lines_and_filters_by_plant() {
        let store = JsonFleetStore::in_memory(directory());
        store.upsert_agent(&report("10.0.0.9", "carol", 7)).unwrap();
        store.upsert_agent(&report("10.0.0.5", "alice", 3)).unwrap();
        store.upsert_agent(&report("10.0.0.77", "orphan", 1)).unwrap();

        let rows = store.read_plant_aggregate("Plant A").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].line_name, "Assembly 1");
        assert_eq!(rows[0].display_user, "alice");
        assert_eq!(rows[0].report_count, 3);

        let rows = store.read_plant_aggregate("Plant C").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].network_address, "10.0.0.9");

        assert!(store.read_plant_aggregate("Plant Z").unwrap().is_empty());
    }

    #[test]
    fn aggregate_keeps_insertion_order_across_replacements() {
        let store = JsonFleetStore::in_memory(directory());
        store.upsert_agent(&report("10.0.0.9", "carol", 7)).unwrap();
        store.upsert_agent(&report("10.0.0.10", "dave", 2)).unwrap();
        store.upsert_agent(&report("10.0.0.9", "carol", 8)).unwrap();

        let rows = store.read_plant_aggregate("Plant C").unwrap();
        let ips: Vec<_> = rows.iter().map(|r| r.network_address.as_str()).collect();
        assert_eq!(ips, vec!["10.0.0.9", "10.0.0.10"]);
        assert_eq!(rows[0].report_count, 8);
    }

    #[test]
    fn find_line_entry_takes_first_match() {
        let store = JsonFleetStore::in_memory(directory());
        let entry = store
            .find_line_entry("L-09")
            .unwrap()
            .unwrap();
        assert_eq!(entry.network_address, "10.0.0.9");

        assert!(store
            .find_line_entry("nope")
            .unwrap()
            .is_none());
    }

    #[test]
    fn reset_clears_counts_but_keeps_detail() {
        let store = JsonFleetStore::in_memory(directory());
        store.upsert_agent(&report("10.0.0.5", "alice", 3)).unwrap();
        store.upsert_agent(&report("10.0.0.9", "carol", 7)).unwrap();

        assert_eq!(store.reset_report_counts().unwrap(), 2);
        for agent in store.list_agents().unwrap() {
            assert_eq!(agent.report_count, 0);
            assert_eq!(agent.progress_detail, "A | B");
        }
    }

    #[test]
    fn agents_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(DIRECTORY_FILE),
            serde_json::to_string(&directory()).unwrap(),
        )
        .unwrap();

        {
            let store = JsonFleetStore::open(dir.path()).unwrap();
            store.upsert_agent(&report("10.0.0.5", "alice", 3)).unwrap();
            store.upsert_agent(&report("10.0.0.9", "carol", 7)).unwrap();
            store.zero_agent_progress("10.0.0.9").unwrap();
        }

        let reopened = JsonFleetStore::open(dir.path()).unwrap();
        let agents = reopened.list_agents().unwrap();
        assert_eq!(agents.len(), 2);
        assert_eq!(agents[0].display_user, "alice");
        assert_eq!(agents[1].report_count, 0);
        assert_eq!(reopened.directory().lines.len(), 3);

        // Le compteur d'id repart après le plus grand id existant
        reopened.upsert_agent(&report("10.0.0.10", "dave", 1)).unwrap();
        let ips: Vec<_> = reopened
            .list_agents()
            .unwrap()
            .into_iter()
            .map(|a| a.network_address)
            .collect();
        assert_eq!(ips, vec!["10.0.0.5", "10.0.0.9", "10.0.0.10"]);
    }

    #[test]
    fn open_without_directory_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFleetStore::open(dir.path()).unwrap();
        assert!(store.directory().plants.is_empty());
        assert!(dir.path().join(AGENTS_FILE).exists());
    }

    #[test]
    fn failed_write_leaves_memory_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        fs::create_dir_all(&data).unwrap();
        fs::write(data.join(DIRECTORY_FILE), serde_json::to_string(&directory()).unwrap()).unwrap();

        let store = JsonFleetStore::open(&data).unwrap();
        store.upsert_agent(&report("10.0.0.5", "alice", 3)).unwrap();

        // Le répertoire disparaît : toute écriture échoue
        fs::remove_dir_all(&data).unwrap();

        assert!(store.upsert_agent(&report("10.0.0.9", "carol", 7)).is_err());
        assert!(store.upsert_agent(&report("10.0.0.5", "bob", 9)).is_err());
        assert!(store.zero_agent_progress("10.0.0.5").is_err());
        assert!(store.reset_report_counts().is_err());

        let agents = store.list_agents().unwrap();
        assert_eq!(agents, vec![report("10.0.0.5", "alice", 3)]);
        assert_eq!(store.read_plant_aggregate("Plant C").unwrap(), vec![]);
        assert_eq!(store.read_plant_aggregate("Plant A").unwrap()[0].report_count, 3);
    }
}
