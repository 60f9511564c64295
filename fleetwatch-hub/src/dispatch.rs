/**
 * DISPATCH - Envoi ciblé d'une commande de capture à un seul agent
 *
 * RÔLE :
 * Résout un identifiant libre (IP, code ligne ou nom de ligne) vers le canal
 * live de l'agent et lui envoie `capture-now`. Jamais de diffusion en repli.
 *
 * RÉSOLUTION :
 * 1. l'identifiant est une adresse présente dans le registre de sessions
 * 2. sinon, première entrée d'annuaire dont l'IP, le code ou le nom correspond,
 *    puis son adresse dans le registre
 * 3. sinon, la requête est abandonnée (journalisée, aucune erreur remontée)
 */

use crate::channels::{CaptureCommand, ChannelId, ChannelSet, Frame, SendOutcome};
use crate::sessions::SessionRegistry;
use crate::store::StoreHandle;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered { channel: ChannelId, network_address: String },
    /// Aucun canal live pour cet identifiant
    Unresolved,
    /// Canal résolu mais fermé ou saturé entre-temps
    Undeliverable { channel: ChannelId },
}

#[derive(Clone)]
pub struct TargetedDispatcher {
    store: StoreHandle,
    sessions: SessionRegistry,
    channels: ChannelSet,
}

impl TargetedDispatcher {
    pub fn new(store: StoreHandle, sessions: SessionRegistry, channels: ChannelSet) -> Self {
        Self { store, sessions, channels }
    }

    /// Adresse réseau + canal live pour l'identifiant, s'il y en a un
    pub async fn resolve(&self, identifier: &str) -> Option<(String, ChannelId)> {
        if let Some(channel) = self.sessions.resolve(identifier) {
            return Some((identifier.to_string(), channel));
        }

        let entry = match self.store.find_line_entry(identifier).await {
            Ok(entry) => entry?,
            Err(e) => {
                log::warn!("[dispatch] directory lookup for {:?} failed: {}", identifier, e);
                return None;
            }
        };

        let channel = self.sessions.resolve(&entry.network_address)?;
        Some((entry.network_address, channel))
    }

    /// L'identifiant est comparé tel quel, sans normalisation
    pub async fn dispatch(&self, identifier: &str) -> DispatchOutcome {
        if identifier.is_empty() {
            log::debug!("[dispatch] empty capture identifier ignored");
            return DispatchOutcome::Unresolved;
        }

        let Some((network_address, channel)) = self.resolve(identifier).await else {
            log::info!("[dispatch] no live channel for {:?}, capture dropped", identifier);
            return DispatchOutcome::Unresolved;
        };

        let command = CaptureCommand {
            command_id: Uuid::new_v4().to_string(),
            identifier: identifier.to_string(),
            ip: network_address.clone(),
        };

        match self.channels.send_to(channel, Frame::capture_now(&command)) {
            SendOutcome::Sent => {
                log::info!(
                    "[dispatch] sent capture {} to {} via {}",
                    command.command_id,
                    network_address,
                    channel
                );
                DispatchOutcome::Delivered { channel, network_address }
            }
            SendOutcome::Dropped | SendOutcome::Gone => {
                log::warn!("[dispatch] capture for {} could not reach {}", network_address, channel);
                DispatchOutcome::Undeliverable { channel }
            }
        }
    }
}
