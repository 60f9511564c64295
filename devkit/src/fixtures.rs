/*!
Fixtures pour tests du hub

Annuaire usines/lignes de référence et constructeur de rapports agents au
format brut envoyé sur le canal (`info.ip`, `numMES`, `detailProgress`...).
*/

use fleetwatch_hub::models::{LineDirectoryEntry, Plant};
use fleetwatch_hub::store::Directory;
use serde_json::{json, Value};

fn line(plant: &str, code: &str, name: &str, ip: &str) -> LineDirectoryEntry {
    LineDirectoryEntry {
        plant_identifier: plant.into(),
        line_code: code.into(),
        line_name: name.into(),
        network_address: ip.into(),
    }
}

/// Deux usines, trois lignes :
/// - Plant A (PA) : L-01 Assembly 1 @ 10.0.0.5, L-02 Assembly 2 @ 10.0.0.6
/// - Plant C (PC) : L-07 Packing 7 @ 10.0.1.7
pub fn sample_directory() -> Directory {
    Directory {
        plants: vec![
            Plant { plant_code: "PA".into(), plant_name: "Plant A".into() },
            Plant { plant_code: "PC".into(), plant_name: "Plant C".into() },
        ],
        lines: vec![
            line("PA", "L-01", "Assembly 1", "10.0.0.5"),
            line("PA", "L-02", "Assembly 2", "10.0.0.6"),
            line("PC", "L-07", "Packing 7", "10.0.1.7"),
        ],
    }
}

/// Constructeur de rapport agent brut
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    ip: String,
    user: String,
    usercode: Option<String>,
    count: Value,
    detail: Value,
    date: String,
}

impl ReportBuilder {
    pub fn new(ip: &str, user: &str) -> Self {
        Self {
            ip: ip.into(),
            user: user.into(),
            usercode: None,
            count: json!(0),
            detail: json!([]),
            date: "01/01/2025 10:00:00 AM".into(),
        }
    }

    pub fn usercode(mut self, code: &str) -> Self {
        self.usercode = Some(code.into());
        self
    }

    pub fn count(mut self, count: impl Into<Value>) -> Self {
        self.count = count.into();
        self
    }

    /// Étapes de progression, envoyées comme `[{title}]`
    pub fn steps(mut self, titles: &[&str]) -> Self {
        self.detail = Value::Array(titles.iter().map(|t| json!({ "title": t })).collect());
        self
    }

    pub fn build(&self) -> Value {
        let mut info = json!({ "ip": self.ip, "user": self.user });
        if let Some(code) = &self.usercode {
            info["usercode"] = json!(code);
        }
        json!({
            "info": info,
            "numMES": self.count,
            "detailProgress": self.detail,
            "dateProgress": self.date,
        })
    }

    /// Frame texte prête à passer dans Connection::handle_text
    pub fn frame_text(&self) -> String {
        json!({ "event": "report", "data": self.build() }).to_string()
    }
}
