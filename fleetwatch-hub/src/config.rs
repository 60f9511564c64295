use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};
use tokio::fs;

pub const DEFAULT_POLL_MS: u64 = 5_000;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct HubConfig {
    pub listen: String,
    pub poll_interval_ms: u64,
    pub plants: Vec<String>,
    pub data_dir: PathBuf,
    /// Taille de la file sortante de chaque canal
    pub channel_buffer: usize,
    /// None = pas de remise à zéro quotidienne
    pub daily_reset: Option<DailyResetConf>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DailyResetConf {
    pub hour: u8,
    pub minute: u8,
    pub utc_offset_hours: i8,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3000".into(),
            poll_interval_ms: DEFAULT_POLL_MS,
            plants: ["Plant A", "Plant C", "Plant D", "Plant E", "Plant F"]
                .into_iter()
                .map(String::from)
                .collect(),
            data_dir: PathBuf::from("./data"),
            channel_buffer: 256,
            // 20:00 heure d'Hô Chi Minh-Ville
            daily_reset: Some(DailyResetConf { hour: 20, minute: 0, utc_offset_hours: 7 }),
        }
    }
}

impl HubConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Surcharges par variables d'environnement : PORT, PLANT_POLL_MS
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT").and_then(|p| p.trim().parse::<u16>().ok()) {
            let host = self
                .listen
                .rsplit_once(':')
                .map(|(host, _)| host.to_string())
                .unwrap_or_else(|| "0.0.0.0".into());
            self.listen = format!("{host}:{port}");
        }

        if let Some(raw) = lookup("PLANT_POLL_MS") {
            // Valeur invalide ou nulle => défaut 5s
            self.poll_interval_ms = match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => ms,
                _ => DEFAULT_POLL_MS,
            };
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("invalid yaml: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Décodage strict : un fichier vide donne la config par défaut
pub fn try_parse_config(txt: &str) -> Result<HubConfig, ConfigError> {
    if txt.trim().is_empty() {
        return Ok(HubConfig::default());
    }
    Ok(serde_yaml::from_str(txt)?)
}

pub fn parse_config(txt: &str) -> HubConfig {
    try_parse_config(txt).unwrap_or_else(|e| {
        log::warn!("[config] {e}, using defaults");
        HubConfig::default()
    })
}

pub async fn read_config(path: &str) -> Result<HubConfig, ConfigError> {
    let txt = fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read { path: path.to_string(), source })?;
    try_parse_config(&txt)
}

pub async fn load_config() -> HubConfig {
    let path = std::env::var("FLEETWATCH_CONFIG").unwrap_or_else(|_| "fleetwatch.yaml".into());
    let mut cfg = if Path::new(&path).exists() {
        read_config(&path).await.unwrap_or_else(|e| {
            log::warn!("[config] {e}, using defaults");
            HubConfig::default()
        })
    } else {
        log::warn!("[config] no {path}, using default config");
        HubConfig::default()
    };
    cfg.apply_env(|key| std::env::var(key).ok());
    cfg
}
