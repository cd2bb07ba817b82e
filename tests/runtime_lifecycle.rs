//! Integration tests for the runtime's startup, tick and shutdown hooks

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tempfile::TempDir;
use tickwork::runtime::action::Action;
use tickwork::runtime::config::{load_config, write_config};
use tickwork::runtime::error::{ConfigError, RuntimeError};
use tickwork::runtime::{
    ActionBatch, ActionRuntime, DelayedAction, Lane, LeafAction, ReadinessFlag,
    RuntimeConfig,
};

fn counter_leaf(counter: &Arc<AtomicUsize>) -> impl Action + 'static {
    let counter = counter.clone();
    LeafAction::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}

#[test]
fn test_runtime_from_config_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("tickwork.json");
    let config = RuntimeConfig {
        tick_budget_ms: 10,
        force_drain_passes: 3,
        ..Default::default()
    };
    write_config(&path, &config).unwrap();

    let loaded = load_config(&path).unwrap();
    let runtime = ActionRuntime::start(loaded, ReadinessFlag::ready().shared()).unwrap();
    assert_eq!(runtime.config().force_drain_passes, 3);
    runtime.shutdown().unwrap();
}

#[test]
fn test_invalid_config_refused() {
    let config = RuntimeConfig {
        tick_budget_ms: 0,
        ..Default::default()
    };
    let result = ActionRuntime::start(config, ReadinessFlag::new().shared());
    assert!(matches!(
        result,
        Err(RuntimeError::Config(ConfigError::ZeroTickBudget))
    ));
}

#[test]
fn test_ticks_and_background_work_together() {
    let handshake = ReadinessFlag::new();
    let mut runtime = ActionRuntime::start(RuntimeConfig::default(), handshake.shared()).unwrap();
    let sync_runs = Arc::new(AtomicUsize::new(0));
    let async_runs = Arc::new(AtomicUsize::new(0));

    runtime.add_action(DelayedAction::new(2, counter_leaf(&sync_runs)), false);
    runtime.add_action(counter_leaf(&sync_runs), true);

    let counter = async_runs.clone();
    runtime
        .submit(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    runtime.tick();
    runtime.tick();
    assert_eq!(sync_runs.load(Ordering::SeqCst), 1);
    assert!(runtime.has_pending_work());
    assert_eq!(runtime.populator().queued(Lane::Gated), 1);
    assert_eq!(runtime.stats().completed, 1);

    handshake.set_ready(true);
    runtime.tick();
    assert_eq!(sync_runs.load(Ordering::SeqCst), 2);
    assert!(!runtime.has_pending_work());
    assert_eq!(runtime.stats().ticks, 3);
    assert_eq!(runtime.populator().queued(Lane::Gated), 0);
    assert!(runtime.worker().is_enabled());

    let stats = runtime.shutdown().unwrap();
    assert_eq!(stats.ticks, 3);
    assert_eq!(stats.completed, 2);
    assert_eq!(async_runs.load(Ordering::SeqCst), 1);
}

#[test]
fn test_shutdown_flushes_outstanding_actions() {
    let runtime =
        ActionRuntime::start(RuntimeConfig::default(), ReadinessFlag::new().shared()).unwrap();
    let runs = Arc::new(AtomicUsize::new(0));

    runtime.add_action(
        ActionBatch::new("save-region")
            .with(DelayedAction::new(5, counter_leaf(&runs)))
            .with(counter_leaf(&runs)),
        false,
    );
    runtime.add_action(counter_leaf(&runs), true);

    let handle = runtime.worker_handle();
    let stats = runtime.shutdown().unwrap();

    assert_eq!(runs.load(Ordering::SeqCst), 3);
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.discarded, 0);
    assert!(!handle.is_enabled());
    assert!(handle.submit(|| Ok(())).is_err());
}
