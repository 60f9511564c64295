/**
 * RECONCILER - Validation et upsert des rapports agents
 *
 * RÔLE :
 * Transforme le payload brut d'un agent en AgentReport normalisé puis
 * l'écrit par upsert (clé = adresse réseau, remplacement complet).
 *
 * FORMAT ENTRANT :
 * ```json
 * {
 *   "info": { "user": "alice", "ip": "10.0.0.5", "usercode": "U-01" },
 *   "numMES": 3,
 *   "detailProgress": [{ "title": "A" }, { "title": "B" }],
 *   "dateProgress": "01/01/2025 10:00:00 AM"
 * }
 * ```
 *
 * RÈGLES :
 * - ip et user obligatoires (non vides après trim)
 * - numMES tolérant : absent, non numérique ou négatif => 0
 * - detailProgress : chaîne déjà jointe ou liste d'objets { title } jointe par " | "
 * - Aucune erreur ici ne ferme le canal émetteur
 */

use crate::models::{AgentReport, DETAIL_DELIMITER};
use crate::store::{StoreError, StoreHandle, UpsertOutcome};
use serde_json::Value;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("report payload must be a JSON object")]
    NotAnObject,
    #[error("missing or empty field: {0}")]
    MissingField(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("invalid report: {0}")]
    Validation(#[from] ValidationError),
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

/// Normalise un payload brut d'agent
pub fn normalize(raw: &Value) -> Result<AgentReport, ValidationError> {
    let obj = raw.as_object().ok_or(ValidationError::NotAnObject)?;
    let info = obj.get("info");

    let network_address = required_text(info.and_then(|i| i.get("ip")), "info.ip")?;
    let display_user = required_text(info.and_then(|i| i.get("user")), "info.user")?;
    let user_code = info
        .and_then(|i| i.get("usercode"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(AgentReport {
        network_address,
        display_user,
        user_code,
        report_count: coerce_count(obj.get("numMES")),
        progress_detail: flatten_detail(obj.get("detailProgress")),
        progress_timestamp: obj
            .get("dateProgress")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    })
}

fn required_text(value: Option<&Value>, field: &'static str) -> Result<String, ValidationError> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(ValidationError::MissingField(field))
}

fn coerce_count(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<u64>().unwrap_or(0),
        _ => 0,
    }
}

fn flatten_detail(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.as_str(),
                other => other.get("title").and_then(Value::as_str).unwrap_or(""),
            })
            .collect::<Vec<_>>()
            .join(DETAIL_DELIMITER),
        _ => String::new(),
    }
}

#[derive(Clone)]
pub struct ReportReconciler {
    store: StoreHandle,
}

impl ReportReconciler {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Valide puis upsert. Retourne le rapport normalisé tel qu'écrit.
    pub async fn submit(&self, raw: &Value) -> Result<AgentReport, ReportError> {
        let report = normalize(raw)?;
        let outcome = self.store.upsert_agent(report.clone()).await?;
        match outcome {
            UpsertOutcome::Created => log::info!(
                "[reconciler] new agent {} ({})",
                report.network_address,
                report.display_user
            ),
            UpsertOutcome::Replaced => log::debug!(
                "[reconciler] updated agent {} ({} reports)",
                report.network_address,
                report.report_count
            ),
        }
        Ok(report)
    }
}
