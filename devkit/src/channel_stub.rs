/*!
Canal enregistreur pour tests sans WebSocket

Remplace la tâche d'écriture WebSocket : reçoit les frames que le hub pousse
vers un canal et les garde en mémoire pour les assertions.
*/

use anyhow::Result;
use fleetwatch_hub::Frame;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

pub struct RecordingChannel {
    receiver: mpsc::Receiver<Frame>,
    seen: Vec<Frame>,
}

impl RecordingChannel {
    pub fn new(buffer: usize) -> (mpsc::Sender<Frame>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self { receiver: rx, seen: Vec::new() })
    }

    /// Attend la prochaine frame portant cet événement, en ignorant les autres
    pub async fn next_event(&mut self, event: &str, timeout_ms: u64) -> Result<Frame> {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            match timeout(remaining, self.receiver.recv()).await {
                Ok(Some(frame)) => {
                    self.seen.push(frame.clone());
                    if frame.event == event {
                        log::debug!("📨 [STUB] got {}", event);
                        return Ok(frame);
                    }
                }
                Ok(None) => anyhow::bail!("channel closed while waiting for {}", event),
                Err(_) => anyhow::bail!("timeout waiting for {} after {}ms", event, timeout_ms),
            }
        }
    }

    /// Vide ce qui est déjà en file sans attendre
    pub fn drain(&mut self) -> Vec<Frame> {
        let mut drained = Vec::new();
        while let Ok(frame) = self.receiver.try_recv() {
            self.seen.push(frame.clone());
            drained.push(frame);
        }
        drained
    }

    /// Collecte tout ce qui arrive pendant `window_ms`
    pub async fn collect_for(&mut self, window_ms: u64) -> Vec<Frame> {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(window_ms);
        let mut collected = Vec::new();
        while let Ok(Some(frame)) = tokio::time::timeout_at(deadline, self.receiver.recv()).await {
            self.seen.push(frame.clone());
            collected.push(frame);
        }
        collected
    }

    /// Échoue si une frame de cet événement arrive pendant `window_ms`
    pub async fn assert_silent(&mut self, event: &str, window_ms: u64) -> Result<()> {
        let frames = self.collect_for(window_ms).await;
        if let Some(frame) = frames.iter().find(|f| f.event == event) {
            anyhow::bail!("unexpected {} frame: {}", event, frame.data);
        }
        Ok(())
    }

    /// Historique complet des frames reçues par ce canal
    pub fn seen(&self) -> &[Frame] {
        &self.seen
    }

    pub fn count(&self, event: &str) -> usize {
        self.seen.iter().filter(|f| f.event == event).count()
    }
}
