use serde::{Deserialize, Serialize};

/// Délimiteur utilisé pour aplatir la liste des sous-rapports en une seule chaîne
pub const DETAIL_DELIMITER: &str = " | ";

/// Dernier état connu d'un agent, clé unique = adresse réseau
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReport {
    pub network_address: String,
    pub display_user: String,
    pub user_code: Option<String>,
    pub report_count: u64,
    pub progress_detail: String,
    pub progress_timestamp: String,
}

impl AgentReport {
    /// Progression considérée comme périmée (agent déconnecté)
    pub fn zero_progress(&mut self) {
        self.report_count = 0;
        self.progress_detail.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plant {
    pub plant_code: String,
    pub plant_name: String,
}

/// Entrée de l'annuaire des lignes (données de référence, jamais créées par le hub)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDirectoryEntry {
    /// Référence `Plant::plant_code`
    pub plant_identifier: String,
    pub line_code: String,
    pub line_name: String,
    pub network_address: String,
}

impl LineDirectoryEntry {
    /// Correspondance exacte sur l'adresse, le code ou le nom de ligne
    pub fn matches(&self, identifier: &str) -> bool {
        self.network_address == identifier || self.line_code == identifier || self.line_name == identifier
    }
}

/// Projection usine/ligne/agent calculée à chaque tick, jamais persistée.
/// Les noms de champs sur le fil reprennent les colonnes attendues par les dashboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantAggregateRow {
    pub plant_name: String,
    pub line_name: String,
    #[serde(rename = "user")]
    pub display_user: String,
    #[serde(rename = "ip")]
    pub network_address: String,
    #[serde(rename = "num_m_e_s")]
    pub report_count: u64,
    #[serde(rename = "detail_progress")]
    pub progress_detail: String,
    #[serde(rename = "date_progress")]
    pub progress_timestamp: String,
}

/// Accusé de redémarrage envoyé par un agent (journalisé uniquement)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RestartAck {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub usercode: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_row_uses_dashboard_column_names() {
        let row = PlantAggregateRow {
            plant_name: "Plant A".into(),
            line_name: "Line 1".into(),
            display_user: "alice".into(),
            network_address: "10.0.0.5".into(),
            report_count: 3,
            progress_detail: "A | B".into(),
            progress_timestamp: "01/01/2025 10:00:00 AM".into(),
        };

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["user"], "alice");
        assert_eq!(json["ip"], "10.0.0.5");
        assert_eq!(json["num_m_e_s"], 3);
        assert_eq!(json["detail_progress"], "A | B");
        assert_eq!(json["date_progress"], "01/01/2025 10:00:00 AM");
    }

    #[test]
    fn zero_progress_keeps_identity() {
        let mut report = AgentReport {
            network_address: "10.0.0.5".into(),
            display_user: "alice".into(),
            user_code: Some("U1".into()),
            report_count: 4,
            progress_detail: "A".into(),
            progress_timestamp: "ts".into(),
        };
        report.zero_progress();
        assert_eq!(report.report_count, 0);
        assert!(report.progress_detail.is_empty());
        assert_eq!(report.display_user, "alice");
        assert_eq!(report.user_code.as_deref(), Some("U1"));
    }

    #[test]
    fn line_entry_matches_address_code_or_name_exactly() {
        let entry = LineDirectoryEntry {
            plant_identifier: "PA".into(),
            line_code: "L-09".into(),
            line_name: "Assembly 9".into(),
            network_address: "10.0.0.9".into(),
        };
        assert!(entry.matches("10.0.0.9"));
        assert!(entry.matches("L-09"));
        assert!(entry.matches("Assembly 9"));
        assert!(!entry.matches("PA"));
        assert!(!entry.matches("Assembly"));
        assert!(!entry.matches(" L-09 "));
    }
}
