/**
 * FLEETWATCH HUB - Point d'entrée principal du serveur
 *
 * RÔLE : Bootstrap du relais : config, stockage JSON, hub partagé, reset
 * quotidien, routes HTTP + WebSocket.
 *
 * ARCHITECTURE : Canaux WebSocket + API REST + stockage fichier, arrêt propre sur Ctrl+C.
 */

use fleetwatch_hub::config::load_config;
use fleetwatch_hub::http;
use fleetwatch_hub::reset::spawn_daily_reset;
use fleetwatch_hub::{Hub, JsonFleetStore};

use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = load_config().await;

    // Sans stockage le hub ne peut rien servir : échec fatal
    let store = JsonFleetStore::open(&cfg.data_dir)
        .with_context(|| format!("cannot open store in {}", cfg.data_dir.display()))?;

    let hub = Hub::new(Arc::new(store), &cfg);

    if let Some(reset) = cfg.daily_reset.clone() {
        spawn_daily_reset(hub.store().clone(), reset).context("daily reset")?;
    }

    let app = http::build_router(hub);

    let listener = TcpListener::bind(&cfg.listen)
        .await
        .with_context(|| format!("cannot bind {}", cfg.listen))?;
    log::info!("[hub] listening on http://{}", cfg.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("[hub] stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("[hub] cannot listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("[hub] shutdown requested");
}
