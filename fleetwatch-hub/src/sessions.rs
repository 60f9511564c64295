/**
 * SESSIONS - Registre adresse réseau <-> canal live
 *
 * RÔLE :
 * Sait par quel canal un agent (identifié par son IP) est joignable en ce moment.
 * Alimenté à chaque rapport reçu, purgé à la fermeture du canal.
 *
 * FONCTIONNEMENT :
 * - Deux index tenus sous un seul Mutex : by_channel et by_address
 * - La dernière association gagne pour une adresse donnée
 * - Une adresse n'est évincée que par la fermeture du canal qui la porte
 */

use crate::channels::ChannelId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct Index {
    by_channel: HashMap<ChannelId, String>,
    by_address: HashMap<String, ChannelId>,
}

#[derive(Clone, Default)]
pub struct SessionRegistry {
    index: Arc<Mutex<Index>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associe l'adresse au canal. Idempotent, remplace l'adresse précédente du canal.
    pub fn register(&self, channel: ChannelId, network_address: &str) {
        let mut index = self.index.lock();

        if let Some(previous) = index.by_channel.insert(channel, network_address.to_string()) {
            if previous != network_address && index.by_address.get(&previous) == Some(&channel) {
                index.by_address.remove(&previous);
            }
        }

        if let Some(displaced) = index.by_address.insert(network_address.to_string(), channel) {
            if displaced != channel {
                log::debug!(
                    "[sessions] {} moved from {} to {}",
                    network_address,
                    displaced,
                    channel
                );
            }
        }
    }

    pub fn resolve(&self, network_address: &str) -> Option<ChannelId> {
        self.index.lock().by_address.get(network_address).copied()
    }

    /// Retire le canal et retourne l'adresse qu'il portait
    pub fn unregister(&self, channel: ChannelId) -> Option<String> {
        let mut index = self.index.lock();
        let address = index.by_channel.remove(&channel)?;
        // L'adresse a pu être reprise par un canal plus récent
        if index.by_address.get(&address) == Some(&channel) {
            index.by_address.remove(&address);
        }
        Some(address)
    }

    pub fn len(&self) -> usize {
        self.index.lock().by_channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
