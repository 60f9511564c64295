/**
 * BROADCAST - Planificateur de diffusion périodique par usine
 *
 * RÔLE :
 * Un seul ticker par processus, démarré quand le premier canal arrive et arrêté
 * quand le dernier repart. Chaque tick relit toutes les usines et les diffuse.
 *
 * FONCTIONNEMENT :
 * - Idle (aucun canal, aucun timer) <-> Active (timer en cours)
 * - Le compteur de canaux et le handle du ticker vivent sous le même Mutex,
 *   les transitions 0->1 et 1->0 ne peuvent pas se croiser
 * - Délai fixe : le prochain tick n'est armé qu'une fois le précédent terminé
 * - L'arrêt annule l'attente en cours ; un tick déjà lancé se termine
 * - Un ticker relancé attend la fin du précédent avant son premier tick
 */

use crate::aggregation::AggregationReader;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerPhase {
    Idle,
    Active,
}

struct Ticker {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct SchedulerState {
    online: usize,
    ticker: Option<Ticker>,
    /// Ticker arrêté dont un tick peut encore être en vol
    draining: Option<JoinHandle<()>>,
}

#[derive(Clone)]
pub struct BroadcastScheduler {
    reader: AggregationReader,
    interval: Duration,
    state: Arc<Mutex<SchedulerState>>,
    ticks: Arc<AtomicU64>,
}

impl BroadcastScheduler {
    pub fn new(reader: AggregationReader, interval: Duration) -> Self {
        Self {
            reader,
            interval,
            state: Arc::new(Mutex::new(SchedulerState::default())),
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Un canal vient de s'ouvrir. Démarre le ticker sur la transition 0 -> 1.
    pub fn subscriber_joined(&self) -> SchedulerPhase {
        let mut state = self.state.lock();
        state.online += 1;
        if state.ticker.is_none() {
            let previous = state.draining.take();
            state.ticker = Some(self.spawn_ticker(previous));
            log::info!(
                "[broadcast] started polling {} plants every {}ms",
                self.reader.plants().len(),
                self.interval.as_millis()
            );
        }
        SchedulerPhase::Active
    }

    /// Un canal vient de se fermer. Arrête le ticker sur la transition 1 -> 0.
    pub fn subscriber_left(&self) -> SchedulerPhase {
        let mut state = self.state.lock();
        state.online = state.online.saturating_sub(1);
        if state.online > 0 {
            return SchedulerPhase::Active;
        }
        if let Some(ticker) = state.ticker.take() {
            // Erreur = le ticker est déjà terminé, rien à annuler
            let _ = ticker.stop.send(());
            state.draining = Some(ticker.handle);
            log::info!("[broadcast] stopped polling (no clients)");
        }
        SchedulerPhase::Idle
    }

    pub fn phase(&self) -> SchedulerPhase {
        if self.state.lock().ticker.is_some() {
            SchedulerPhase::Active
        } else {
            SchedulerPhase::Idle
        }
    }

    pub fn online(&self) -> usize {
        self.state.lock().online
    }

    /// Nombre de ticks terminés depuis le démarrage du processus
    pub fn ticks_completed(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    fn spawn_ticker(&self, previous: Option<JoinHandle<()>>) -> Ticker {
        let (stop, mut stopped) = oneshot::channel::<()>();
        let reader = self.reader.clone();
        let interval = self.interval;
        let ticks = self.ticks.clone();

        let handle = tokio::spawn(async move {
            if let Some(previous) = previous {
                if let Err(e) = previous.await {
                    log::warn!("[broadcast] previous ticker ended abnormally: {}", e);
                }
            }
            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = tokio::time::sleep(interval) => {}
                }
                let summary = reader.broadcast_tick().await;
                ticks.fetch_add(1, Ordering::Relaxed);
                if !summary.failed.is_empty() {
                    log::warn!("[broadcast] tick skipped plants: {:?}", summary.failed);
                }
            }
        });

        Ticker { stop, handle }
    }
}
