//! Scénarios bout en bout du relais : canaux enregistreurs + stockage instable

use fleetwatch_devkit::{RecordingChannel, ReportBuilder, TestHarness};
use fleetwatch_hub::broadcast::SchedulerPhase;
use fleetwatch_hub::Frame;
use serde_json::json;
use std::time::Duration;

/// Attend une frame `data:<usine>` dont une ligne vérifie la condition
async fn wait_for_row<F>(channel: &mut RecordingChannel, plant: &str, check: F) -> Frame
where
    F: Fn(&serde_json::Value) -> bool,
{
    let topic = format!("data:{plant}");
    for _ in 0..40 {
        let frame = channel.next_event(&topic, 1000).await.unwrap();
        if frame.data.as_array().is_some_and(|rows| rows.iter().any(&check)) {
            return frame;
        }
    }
    panic!("no {topic} frame matched");
}

#[tokio::test]
async fn dashboards_get_snapshots_and_ticks_follow_subscribers() {
    let harness = TestHarness::ticking(40);
    assert_eq!(harness.hub.scheduler().phase(), SchedulerPhase::Idle);

    let (first, mut first_rx) = harness.connect();
    let (second, mut second_rx) = harness.connect();
    assert_eq!(harness.hub.scheduler().phase(), SchedulerPhase::Active);

    for rx in [&mut first_rx, &mut second_rx] {
        rx.next_event("data:Plant A", 1000).await.unwrap();
        rx.next_event("data:Plant C", 1000).await.unwrap();
    }

    first.close().await;
    assert_eq!(harness.hub.scheduler().phase(), SchedulerPhase::Active);

    // Le survivant continue de recevoir les ticks
    second_rx.drain();
    let before = harness.hub.scheduler().ticks_completed();
    second_rx.next_event("data:Plant A", 1000).await.unwrap();
    second_rx.next_event("data:Plant A", 1000).await.unwrap();
    assert!(harness.hub.scheduler().ticks_completed() > before);

    second.close().await;
    assert_eq!(harness.hub.scheduler().phase(), SchedulerPhase::Idle);

    let stopped_at = harness.hub.scheduler().ticks_completed();
    tokio::time::sleep(Duration::from_millis(200)).await;
    // Au plus un tick déjà lancé au moment de l'arrêt
    assert!(harness.hub.scheduler().ticks_completed() <= stopped_at + 1);
}

#[tokio::test]
async fn agent_report_flows_to_plant_view_and_is_zeroed_on_disconnect() {
    let harness = TestHarness::ticking(40);
    let (agent, _agent_rx) = harness.connect();
    let (_dashboard, mut dash_rx) = harness.connect();

    let report = ReportBuilder::new("10.0.0.5", "alice").count(3).steps(&["A", "B"]);
    agent.handle_text(&report.frame_text()).await;

    let echo = dash_rx.next_event("report", 1000).await.unwrap();
    assert_eq!(echo.data, report.build());

    let frame = wait_for_row(&mut dash_rx, "Plant A", |row| row["user"] == "alice").await;
    let row = frame.data.as_array().unwrap().iter().find(|r| r["user"] == "alice").unwrap().clone();
    assert_eq!(row["line_name"], "Assembly 1");
    assert_eq!(row["ip"], "10.0.0.5");
    assert_eq!(row["num_m_e_s"], 3);
    assert_eq!(row["detail_progress"], "A | B");

    let summary = agent.close().await;
    assert_eq!(summary.reconciled.as_deref(), Some("10.0.0.5"));

    wait_for_row(&mut dash_rx, "Plant A", |row| {
        row["user"] == "alice" && row["num_m_e_s"] == 0 && row["detail_progress"] == ""
    })
    .await;
}

#[tokio::test]
async fn capture_by_line_code_reaches_only_that_agent() {
    let harness = TestHarness::new();
    let (agent_a, mut rx_a) = harness.connect();
    let (agent_c, mut rx_c) = harness.connect();
    let (dashboard, mut rx_dash) = harness.connect();

    agent_a.handle_text(&ReportBuilder::new("10.0.0.5", "alice").frame_text()).await;
    agent_c.handle_text(&ReportBuilder::new("10.0.1.7", "carol").frame_text()).await;

    dashboard
        .handle_text(&json!({ "event": "capture-request", "data": "L-07" }).to_string())
        .await;

    let capture = rx_c.next_event("capture-now", 1000).await.unwrap();
    assert_eq!(capture.data["ip"], "10.0.1.7");
    assert_eq!(capture.data["identifier"], "L-07");
    assert!(capture.data["command_id"].as_str().is_some_and(|id| !id.is_empty()));

    rx_a.assert_silent("capture-now", 100).await.unwrap();
    rx_dash.assert_silent("capture-now", 20).await.unwrap();
}

#[tokio::test]
async fn unresolved_capture_delivers_nothing() {
    let harness = TestHarness::new();
    let (agent, mut rx_agent) = harness.connect();
    let (dashboard, mut rx_dash) = harness.connect();
    agent.handle_text(&ReportBuilder::new("10.0.0.5", "alice").frame_text()).await;

    // Ligne connue de l'annuaire mais agent hors ligne, puis identifiant inconnu
    for identifier in ["L-02", "nowhere", "   "] {
        dashboard
            .handle_text(&json!({ "event": "capture-request", "data": identifier }).to_string())
            .await;
    }

    rx_agent.assert_silent("capture-now", 100).await.unwrap();
    rx_dash.assert_silent("capture-now", 20).await.unwrap();
}

#[tokio::test]
async fn failing_plant_does_not_block_the_others() {
    let harness = TestHarness::ticking(40);
    harness.store.fail_plant("Plant A");

    let (_dashboard, mut rx) = harness.connect();
    // Instantané + au moins deux ticks : le premier tick est forcément terminé
    for _ in 0..3 {
        rx.next_event("data:Plant C", 1000).await.unwrap();
    }
    assert_eq!(rx.count("data:Plant A"), 0);
    assert!(harness.store.reads_of("Plant A") >= 2);

    harness.store.heal_plant("Plant A");
    rx.next_event("data:Plant A", 1000).await.unwrap();
}

#[tokio::test]
async fn rejected_writes_are_not_echoed_nor_registered() {
    let harness = TestHarness::new();
    let (agent, _rx_agent) = harness.connect();
    let (_dashboard, mut rx_dash) = harness.connect();

    harness.store.fail_writes(true);
    agent.handle_text(&ReportBuilder::new("10.0.0.5", "alice").count(1).frame_text()).await;

    rx_dash.assert_silent("report", 100).await.unwrap();
    assert!(harness.hub.sessions().is_empty());

    harness.store.fail_writes(false);
    agent.handle_text(&ReportBuilder::new("10.0.0.5", "alice").count(2).frame_text()).await;
    rx_dash.next_event("report", 1000).await.unwrap();
    assert_eq!(harness.hub.sessions().resolve("10.0.0.5"), Some(agent.id()));
}

#[tokio::test]
async fn closing_a_superseded_channel_still_zeroes_the_agent() {
    let harness = TestHarness::new();
    let (old, _old_rx) = harness.connect();
    old.handle_text(&ReportBuilder::new("10.0.0.5", "alice").count(3).frame_text()).await;

    let (new, _new_rx) = harness.connect();
    new.handle_text(&ReportBuilder::new("10.0.0.5", "alice").count(4).frame_text()).await;

    let summary = old.close().await;
    assert_eq!(summary.reconciled.as_deref(), Some("10.0.0.5"));

    let agent = harness.agent("10.0.0.5").await.unwrap().unwrap();
    assert_eq!(agent.report_count, 0);
    assert_eq!(agent.progress_detail, "");
    // Le canal récent reste la cible des captures
    assert_eq!(harness.hub.sessions().resolve("10.0.0.5"), Some(new.id()));
}

#[tokio::test]
async fn aborted_connection_is_reconciled_in_background() {
    let harness = TestHarness::new();
    let (conn, _rx) = harness.connect();
    conn.handle_text(&ReportBuilder::new("10.0.0.6", "bob").count(5).steps(&["X"]).frame_text()).await;
    drop(conn);

    let agent = harness
        .wait_for_agent("10.0.0.6", 1000, |a| a.report_count == 0)
        .await
        .unwrap();
    assert_eq!(agent.progress_detail, "");
    assert!(harness.hub.channels().is_empty());
}
