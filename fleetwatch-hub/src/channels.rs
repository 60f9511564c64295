/**
 * CHANNELS - Ensemble des canaux live (agents et dashboards)
 *
 * RÔLE :
 * Garde la table channel_id -> émetteur de frames de chaque connexion ouverte.
 * Toutes les diffusions (tick par usine, écho des rapports, force-report,
 * capture ciblée) passent par ici.
 *
 * FONCTIONNEMENT :
 * - Une frame = {"event": <topic>, "data": <payload>} en texte JSON
 * - Chaque canal a une file bornée ; l'envoi est best-effort (try_send),
 *   un client lent ne bloque jamais la diffusion vers les autres
 */

use crate::models::{PlantAggregateRow, RestartAck};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

pub const TOPIC_REPORT: &str = "report";
pub const TOPIC_FORCE_REPORT: &str = "force-report";
pub const TOPIC_CAPTURE_NOW: &str = "capture-now";
pub const PLANT_TOPIC_PREFIX: &str = "data:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(Uuid);

impl ChannelId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChannelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Message sortant adressé par topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// Commande de capture envoyée à un seul agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureCommand {
    pub command_id: String,
    pub identifier: String,
    pub ip: String,
}

impl Frame {
    pub fn plant_topic(plant_name: &str) -> String {
        format!("{PLANT_TOPIC_PREFIX}{plant_name}")
    }

    pub fn plant_data(plant_name: &str, rows: &[PlantAggregateRow]) -> Self {
        Self {
            event: Self::plant_topic(plant_name),
            data: serde_json::to_value(rows).unwrap_or(Value::Array(Vec::new())),
        }
    }

    /// Écho brut d'un rapport agent vers tous les observateurs
    pub fn report(raw: Value) -> Self {
        Self { event: TOPIC_REPORT.to_string(), data: raw }
    }

    pub fn force_report() -> Self {
        Self {
            event: TOPIC_FORCE_REPORT.to_string(),
            data: Value::String(TOPIC_FORCE_REPORT.to_string()),
        }
    }

    pub fn capture_now(command: &CaptureCommand) -> Self {
        Self {
            event: TOPIC_CAPTURE_NOW.to_string(),
            data: serde_json::to_value(command).unwrap_or(Value::Null),
        }
    }
}

/// Événements reçus d'un canal
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum InboundEvent {
    /// `mes-report` = nom historique de l'événement côté agents
    #[serde(rename = "report", alias = "mes-report")]
    Report(Value),
    #[serde(rename = "capture-request")]
    CaptureRequest(String),
    #[serde(rename = "restart-ack")]
    RestartAck(RestartAck),
}

pub type FrameSender = mpsc::Sender<Frame>;

/// Résultat d'un envoi unicast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// File pleine : frame abandonnée
    Dropped,
    /// Canal inconnu ou fermé
    Gone,
}

#[derive(Clone, Default)]
pub struct ChannelSet {
    senders: Arc<parking_lot::RwLock<HashMap<ChannelId, FrameSender>>>,
}

impl ChannelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, id: ChannelId, sender: FrameSender) {
        self.senders.write().insert(id, sender);
    }

    /// Retourne false si le canal n'était pas attaché
    pub fn detach(&self, id: ChannelId) -> bool {
        self.senders.write().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.senders.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.read().is_empty()
    }

    pub fn send_to(&self, id: ChannelId, frame: Frame) -> SendOutcome {
        let Some(sender) = self.senders.read().get(&id).cloned() else {
            return SendOutcome::Gone;
        };
        deliver(id, &sender, frame)
    }

    /// Diffusion best-effort, retourne le nombre de canaux servis
    pub fn broadcast(&self, frame: &Frame) -> usize {
        let targets: Vec<(ChannelId, FrameSender)> = self
            .senders
            .read()
            .iter()
            .map(|(id, s)| (*id, s.clone()))
            .collect();

        targets
            .iter()
            .filter(|(id, sender)| deliver(*id, sender, frame.clone()) == SendOutcome::Sent)
            .count()
    }
}

fn deliver(id: ChannelId, sender: &FrameSender, frame: Frame) -> SendOutcome {
    match sender.try_send(frame) {
        Ok(()) => SendOutcome::Sent,
        Err(mpsc::error::TrySendError::Full(frame)) => {
            log::warn!("[channels] queue full on {}, dropped {}", id, frame.event);
            SendOutcome::Dropped
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            log::debug!("[channels] {} already closed", id);
            SendOutcome::Gone
        }
    }
}
