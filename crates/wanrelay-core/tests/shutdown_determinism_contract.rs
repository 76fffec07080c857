//! Contract Test: Shutdown Determinism
//!
//! Constraints verified:
//! - The dispatcher terminates on a shutdown signal
//! - Events already accepted by an updater are delivered before it returns
//! - No batch is cut off halfway

mod common;

use common::*;
use std::sync::Arc;
use std::time::Duration;
use wanrelay_core::{ChangeDispatcher, DestinationRegistry};

#[tokio::test]
async fn shutdown_signal_terminates_idle_dispatcher() {
    let (dispatcher, _sender) = ChangeDispatcher::new(DestinationRegistry::new());
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let running = tokio::spawn(dispatcher.run_with_shutdown(shutdown_rx));
    tokio::time::sleep(Duration::from_millis(20)).await;
    shutdown_tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), running).await;
    assert!(result.is_ok(), "dispatcher should stop within 5 seconds");
    assert!(result.unwrap().unwrap().is_ok());
}

#[tokio::test]
async fn shutdown_drains_accepted_events() {
    let log = mark_log();
    let mut registry = DestinationRegistry::new();
    registry.register(Arc::new(RecordingDestination::new(
        "slow",
        Duration::from_millis(40),
        log.clone(),
    )));

    let (dispatcher, sender) = ChangeDispatcher::new(registry);
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let running = tokio::spawn(dispatcher.run_with_shutdown(shutdown_rx));

    for last in 1..=3 {
        sender.send(v4(last)).await.unwrap();
    }
    // let the dispatcher hand all three to the updater
    tokio::time::sleep(Duration::from_millis(20)).await;
    shutdown_tx.send(()).unwrap();

    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("dispatcher should stop within 5 seconds")
        .unwrap()
        .unwrap();

    assert_eq!(delivered(&log, "slow"), vec![v4(1), v4(2), v4(3)]);

    let marks = log.lock().unwrap();
    let starts = marks.iter().filter(|m| matches!(m, Mark::Start(..))).count();
    let ends = marks.iter().filter(|m| matches!(m, Mark::End(..))).count();
    assert_eq!(starts, ends, "every started batch finished");
}

#[tokio::test]
async fn senders_fail_after_dispatcher_stops() {
    let (dispatcher, sender) = ChangeDispatcher::new(DestinationRegistry::new());
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let running = tokio::spawn(dispatcher.run_with_shutdown(shutdown_rx));
    shutdown_tx.send(()).unwrap();
    running.await.unwrap().unwrap();

    assert!(sender.send(v4(1)).await.is_err());
}
