//! End-to-end lifecycle scenarios

use std::time::Duration;

use raiz_core::{
    NodeId, RaizError, SimTime, TronId, TronSpec, TronState, Valor, FREQUENCIA_RANGE,
    POTENCIA_RANGE, TTL_RANGE_SECONDS,
};
use raiz_diffusion::Channel;
use raiz_runtime::{PipelineStage, SystemConfig};

use crate::{quiet_config, spawn_script, unit_for_index, ScriptedRandom, SimulationHarness};

fn secs(s: u64) -> SimTime {
    SimTime::from_secs(s)
}

fn node(id: &str) -> NodeId {
    NodeId::from(id)
}

fn origin(h: &SimulationHarness, id: &TronId) -> NodeId {
    h.history(id).map(|hist| hist.node.clone()).unwrap()
}

// ============================================================================
// LIFECYCLE
// ============================================================================

#[test]
fn test_ttl_expiry_then_grace_then_removal() {
    let mut h = SimulationHarness::seeded(1).unwrap();
    h.start();
    let id = h.spawn_on("node-001", TronSpec::new("short").with_ttl(1)).unwrap();

    h.run_until(SimTime::from_millis(999));
    assert_eq!(h.history(&id).unwrap().last_state(), TronState::Alive);

    h.run_until(secs(1));
    assert_eq!(h.history(&id).unwrap().entered(TronState::Dying), Some(secs(1)));

    h.run_until(SimTime::from_millis(2_999));
    assert!(h.system().node(&node("node-001")).unwrap().contains(&id));

    h.run_until(secs(10));
    let history = h.history(&id).unwrap();
    assert_eq!(history.entered(TronState::Dead), Some(secs(3)));
    assert_eq!(history.ttl_samples.last().map(|(_, r)| *r), Some(0));
    // Delivery at 4s finds the TRON gone
    assert_eq!(h.system().stats().pipelines_abandoned, 1);
    assert!(h.report().passed(), "{:?}", h.violations());
}

#[test]
fn test_full_pipeline_timing() {
    let mut script = ScriptedRandom::new(spawn_script(1, 3, Valor::Positive, 30));
    // Delivery target: first peer of node-002
    script.push([unit_for_index(0, 2)]);
    let mut h = SimulationHarness::new(quiet_config(), script).unwrap();
    h.start();

    let id = h.spawn().unwrap();
    assert_eq!(origin(&h, &id), node("node-002"));

    h.run_until(secs(1));
    assert_eq!(h.history(&id).unwrap().replicas, 2);
    assert_eq!(h.system().gateway().total_messages(), 0);

    h.run_until(secs(2));
    assert_eq!(h.system().gateway().total_messages(), 4);
    let status = h.system().node(&node("node-002")).unwrap().status();
    assert_eq!(status.stats.messages_sent, 4);

    h.run_until(secs(10));
    let history = h.history(&id).unwrap();
    assert_eq!(history.delivered_at, Some(secs(4)));
    assert_eq!(history.target, Some(node("node-001")));
    assert_eq!(history.entered(TronState::Dying), Some(secs(4)));
    assert_eq!(history.entered(TronState::Dead), Some(secs(6)));
    assert_eq!(
        history.state_path(),
        vec![TronState::Alive, TronState::Dying, TronState::Dead]
    );
    assert!(h.report().passed(), "{:?}", h.violations());
}

#[test]
fn test_delivery_between_sweeps_waits_for_next_tick() {
    let mut config = quiet_config();
    config.pipeline.delivery_delay = Duration::from_millis(2_500);
    let mut h = SimulationHarness::new(config, ScriptedRandom::new(spawn_script(0, 3, Valor::Neutral, 25)))
        .unwrap();
    h.start();
    let id = h.spawn().unwrap();

    h.run_until(secs(10));
    let history = h.history(&id).unwrap();
    assert_eq!(history.delivered_at, Some(SimTime::from_millis(4_500)));
    assert_eq!(history.entered(TronState::Dying), Some(secs(5)));
    assert_eq!(history.entered(TronState::Dead), Some(secs(7)));
}

#[test]
fn test_forced_apoptosis_does_not_count_as_triggered() {
    let mut h = SimulationHarness::seeded(8).unwrap();
    h.start();
    for _ in 0..5 {
        h.spawn().unwrap();
    }
    assert_eq!(h.force_apoptosis(), 5);
    assert_eq!(h.system().current_stage(), Some(PipelineStage::Apoptosis));

    h.run_until(secs(3));
    assert_eq!(h.report().trons_live, 0);
    assert_eq!(h.report().trons_reaped, 5);
    for status in h.system().node_statuses() {
        assert_eq!(status.stats.apoptosis_triggered, 0);
        assert_eq!(status.stats.trons_deleted, status.stats.trons_created);
    }
    assert!(h.report().passed(), "{:?}", h.violations());
}

// ============================================================================
// NODE AND GATEWAY EDGES
// ============================================================================

#[test]
fn test_mark_delivered_unknown_id_changes_nothing() {
    let mut h = SimulationHarness::seeded(2).unwrap();
    h.start();
    h.spawn_on("node-001", TronSpec::new("x")).unwrap();
    let before = h.system().node_statuses();

    let ghost = TronId::generate(SimTime::ZERO);
    let n = h.system_mut().node_mut(&node("node-001")).unwrap();
    assert!(!n.mark_delivered(&ghost, &node("node-002")));

    assert_eq!(h.system().node_statuses(), before);
}

#[test]
fn test_inactive_udp_channel_drops_messages() {
    let mut h = SimulationHarness::seeded(3).unwrap();
    h.system_mut().gateway_mut().set_active(Channel::Udp, false);
    h.start();
    let id = h.spawn_on("node-003", TronSpec::new("x")).unwrap();

    let tron = h
        .system()
        .node(&node("node-003"))
        .and_then(|n| n.get(&id))
        .cloned()
        .unwrap();
    let gateway = h.system_mut().gateway_mut();
    assert_eq!(gateway.propagate_named(&tron, "udp"), 0);
    assert_eq!(gateway.total_messages(), 0);

    h.run_until(secs(2));
    let gateway = h.system().gateway();
    assert_eq!(gateway.messages(Channel::Udp), 0);
    assert_eq!(gateway.messages(Channel::WebSocket), 1);
    assert_eq!(gateway.total_messages(), 3);
}

#[test]
fn test_replication_reaches_exactly_the_peers() {
    let mut h = SimulationHarness::seeded(4).unwrap();
    h.start();
    let id = h.spawn_on("node-002", TronSpec::new("x")).unwrap();
    h.run_until(secs(1));

    let tron = h.system().node(&node("node-002")).unwrap().get(&id).unwrap();
    let replicas: Vec<&NodeId> = tron.replicas().iter().collect();
    assert_eq!(replicas, vec![&node("node-001"), &node("node-003")]);
    assert_eq!(
        h.system().node(&node("node-002")).unwrap().stats().trons_replicated,
        2
    );
}

#[test]
fn test_replicas_bounded_by_peer_count() {
    let mut config = quiet_config();
    config.node_ids = (1..=5).map(|i| NodeId::new(format!("node-{i:03}"))).collect();
    let mut h = SimulationHarness::new(config, raiz_core::SeededRandom::new(5)).unwrap();
    h.start();
    for _ in 0..20 {
        h.spawn().unwrap();
        h.run_for(Duration::from_millis(300));
    }
    h.run_for(Duration::from_secs(40));

    assert!(h.histories().all(|(_, hist)| hist.replicas <= 4));
    assert!(h.histories().any(|(_, hist)| hist.replicas == 4));
    assert!(h.report().passed(), "{:?}", h.violations());
}

// ============================================================================
// SYSTEM COMMANDS
// ============================================================================

#[test]
fn test_spawn_while_stopped_is_rejected() {
    let mut h = SimulationHarness::seeded(6).unwrap();
    assert!(matches!(h.spawn(), Err(RaizError::SystemNotRunning)));

    h.start();
    h.spawn().unwrap();
    h.stop();
    assert!(matches!(h.spawn(), Err(RaizError::SystemNotRunning)));
    assert_eq!(h.report().trons_observed, 1);
}

#[test]
fn test_reset_wipes_nodes_and_gateway() {
    let mut h = SimulationHarness::seeded(7).unwrap();
    h.start();
    for _ in 0..6 {
        h.spawn().unwrap();
    }
    h.run_until(secs(3));
    assert!(h.system().gateway().total_messages() > 0);

    h.reset();
    let snapshot = h.system().snapshot();
    assert!(!snapshot.running);
    assert_eq!(snapshot.current_stage, None);
    assert_eq!(snapshot.trons_active(), 0);
    assert_eq!(snapshot.gateway.total_messages, 0);
    assert!(snapshot.gateway.channels.values().all(|c| c.active && c.messages == 0));
    for status in &snapshot.nodes {
        assert_eq!(status.stats, Default::default());
    }
    assert!(h.histories().all(|(_, hist)| hist.is_closed()));

    // The system comes back cleanly
    h.start();
    h.spawn().unwrap();
    h.run_for(Duration::from_secs(40));
    assert!(h.report().passed(), "{:?}", h.violations());
}

#[test]
fn test_restart_before_pending_tick_keeps_one_sweep_loop() {
    let mut h = SimulationHarness::seeded(9).unwrap();
    h.start();
    h.run_until(SimTime::from_millis(400));
    h.stop();
    h.start();
    h.run_until(SimTime::from_millis(5_500));

    assert_eq!(h.system().stats().sweep_ticks, 15);
    assert!(h.system().nodes().iter().all(|n| n.is_sweep_active()));
}

#[test]
fn test_auto_spawn_follows_coin_flips() {
    let mut config = SystemConfig::default();
    config.auto_spawn.probability = 0.3;
    let mut script = ScriptedRandom::new([0.29]).with_fallback(0.3);
    script.push(spawn_script(2, 3, Valor::Negative, 20));
    let mut h = SimulationHarness::new(config, script).unwrap();
    h.start();

    h.run_until(SimTime::from_millis(4_999));
    assert_eq!(h.report().trons_observed, 0);

    h.run_until(secs(5));
    assert_eq!(h.system().stats().auto_spawns, 1);
    let (_, history) = h.histories().next().unwrap();
    assert_eq!(history.node, node("node-003"));
    assert_eq!(history.ttl_seconds, 20);

    // Every later flip draws 0.3, which is not below the threshold
    h.run_until(secs(30));
    assert_eq!(h.system().stats().auto_spawns, 1);
}

#[test]
fn test_random_attributes_stay_in_domain() {
    let mut h = SimulationHarness::seeded(10).unwrap();
    h.start();
    for _ in 0..300 {
        h.spawn().unwrap();
    }

    let (ttl_lo, ttl_hi) = TTL_RANGE_SECONDS;
    for tron in h.system().live_trons() {
        let ttl = tron.ttl_remaining as u32;
        assert!((ttl_lo..=ttl_hi).contains(&ttl));
        assert!(tron.potencia >= POTENCIA_RANGE.0 && tron.potencia < POTENCIA_RANGE.1);
        assert!(tron.frequencia >= FREQUENCIA_RANGE.0 && tron.frequencia < FREQUENCIA_RANGE.1);
        assert_eq!(tron.progress, 0.0);
        assert!(tron.content.as_str().is_some_and(|s| s.starts_with("tron payload")));
    }
    let nodes_used = h
        .system()
        .node_statuses()
        .iter()
        .filter(|s| s.trons_active > 0)
        .count();
    assert_eq!(nodes_used, 3);
}
