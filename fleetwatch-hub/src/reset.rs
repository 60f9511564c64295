use crate::config::DailyResetConf;
use crate::store::StoreHandle;
use time::{format_description::well_known::Rfc3339, OffsetDateTime, Time, UtcOffset};
use tokio::task;

#[derive(Debug, thiserror::Error)]
pub enum ResetError {
    #[error("invalid reset schedule: {0}")]
    Schedule(#[from] time::error::ComponentRange),
}

/// Prochaine occurrence stricte de hour:minute au décalage configuré
pub fn next_run_after(now: OffsetDateTime, conf: &DailyResetConf) -> Result<OffsetDateTime, ResetError> {
    let offset = UtcOffset::from_hms(conf.utc_offset_hours, 0, 0)?;
    let at = Time::from_hms(conf.hour, conf.minute, 0)?;

    let local_now = now.to_offset(offset);
    let today = local_now.replace_time(at);
    if today > local_now {
        Ok(today)
    } else {
        Ok(today + time::Duration::days(1))
    }
}

/// Démarre la remise à zéro quotidienne des compteurs de rapports
pub fn spawn_daily_reset(store: StoreHandle, conf: DailyResetConf) -> Result<(), ResetError> {
    // Valide le planning avant de lancer la tâche
    next_run_after(OffsetDateTime::now_utc(), &conf)?;

    task::spawn(async move {
        loop {
            let now = OffsetDateTime::now_utc();
            let next = match next_run_after(now, &conf) {
                Ok(next) => next,
                Err(e) => {
                    log::error!("[reset] {e}");
                    return;
                }
            };
            log::info!(
                "[reset] next report counter reset at {}",
                next.format(&Rfc3339).unwrap_or_default()
            );

            let wait = std::time::Duration::try_from(next - now).unwrap_or_default();
            tokio::time::sleep(wait).await;

            match store.reset_report_counts().await {
                Ok(affected) => log::info!("[reset] reset report count to 0 for {} agent(s)", affected),
                Err(e) => log::error!("[reset] reset failed: {}", e),
            }
        }
    });

    Ok(())
}
