/**
 * LIFECYCLE - Cycle de vie d'un canal : connexion -> actif -> fermé
 *
 * RÔLE :
 * Point d'entrée unique des événements d'un canal, quel que soit le transport.
 *
 * FONCTIONNEMENT :
 * - connect() : attache le canal, réveille le planificateur (0 -> 1),
 *   envoie un instantané par usine à ce seul canal
 * - handle() : rapport => upsert + enregistrement IP/canal + écho à tous ;
 *   capture-request => dispatch ciblé ; restart-ack => journal
 * - close() : détache, désenregistre, remet à zéro la progression de l'agent
 *   porté par ce canal, endort le planificateur (1 -> 0)
 *
 * NOTE :
 * L'adresse n'est associée au canal qu'à la réception d'un rapport. Un canal
 * fermé avant tout rapport n'a donc rien à réconcilier.
 */

use crate::channels::{ChannelId, Frame, FrameSender, InboundEvent};
use crate::hub::Hub;
use serde_json::Value;

/// Canal actif. Consommé par close() : l'état fermé est terminal.
pub struct Connection {
    hub: Hub,
    id: ChannelId,
    closed: bool,
}

/// Résultat de la fermeture d'un canal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseSummary {
    pub channel: ChannelId,
    /// Adresse dont la progression a été remise à zéro
    pub reconciled: Option<String>,
}

impl Hub {
    pub fn connect(&self, sender: FrameSender) -> Connection {
        let id = ChannelId::new();
        self.channels.attach(id, sender);
        self.scheduler.subscriber_joined();
        log::info!("[lifecycle] client connected {} | online: {}", id, self.scheduler.online());

        // Rattrapage sans attendre le prochain tick, une tâche par usine
        self.reader.send_snapshot(id).detach_all();

        Connection { hub: self.clone(), id, closed: false }
    }
}

impl Connection {
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Décode une frame texte et la traite ; les frames inconnues sont ignorées
    pub async fn handle_text(&self, text: &str) {
        match serde_json::from_str::<InboundEvent>(text) {
            Ok(event) => self.handle(event).await,
            Err(e) => log::debug!("[lifecycle] ignored frame from {}: {}", self.id, e),
        }
    }

    pub async fn handle(&self, event: InboundEvent) {
        match event {
            InboundEvent::Report(raw) => self.on_report(raw).await,
            InboundEvent::CaptureRequest(identifier) => {
                self.hub.dispatcher.dispatch(&identifier).await;
            }
            InboundEvent::RestartAck(ack) => log::info!(
                "[lifecycle] restart ack from {} (ip: {}, user: {}, usercode: {})",
                self.id,
                ack.ip.as_deref().unwrap_or("-"),
                ack.user.as_deref().unwrap_or("-"),
                ack.usercode.as_deref().unwrap_or("-")
            ),
        }
    }

    async fn on_report(&self, raw: Value) {
        match self.hub.reconciler.submit(&raw).await {
            Ok(report) => {
                self.hub.sessions.register(self.id, &report.network_address);
                self.hub.channels.broadcast(&Frame::report(raw));
            }
            Err(e) => log::warn!("[lifecycle] report from {} rejected: {}", self.id, e),
        }
    }

    pub async fn close(mut self) -> CloseSummary {
        self.closed = true;
        let address = self.release();

        let reconciled = match address {
            Some(address) => reconcile(&self.hub, address).await,
            None => None,
        };

        CloseSummary { channel: self.id, reconciled }
    }

    /// Partie synchrone de la fermeture, partagée avec Drop
    fn release(&self) -> Option<String> {
        self.hub.channels.detach(self.id);
        let address = self.hub.sessions.unregister(self.id);
        self.hub.scheduler.subscriber_left();
        log::info!(
            "[lifecycle] client disconnected {} | online: {}",
            self.id,
            self.hub.scheduler.online()
        );
        address
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        // Tâche de connexion interrompue sans close()
        let address = self.release();
        if let (Some(address), Ok(runtime)) = (address, tokio::runtime::Handle::try_current()) {
            let hub = self.hub.clone();
            runtime.spawn(async move {
                reconcile(&hub, address).await;
            });
        }
    }
}

/// Remet à zéro la progression d'un agent dont le canal vient de fermer
async fn reconcile(hub: &Hub, address: String) -> Option<String> {
    match hub.store.zero_agent_progress(&address).await {
        Ok(true) => {
            log::info!("[lifecycle] zeroed progress of {}", address);
            Some(address)
        }
        Ok(false) => None,
        Err(e) => {
            log::error!("[lifecycle] failed to zero progress of {}: {}", address, e);
            None
        }
    }
}
