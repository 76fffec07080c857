//! Destination updater workers
//!
//! Every destination gets exactly one worker task fed by a bounded queue.
//! The worker takes one event, hands it to [`Destination::deliver`], waits
//! for the whole batch to finish, and only then takes the next event.
//!
//! ```text
//!  submit() ──► [ queue (10) ] ──► worker ──► Destination::deliver()
//!                                                 │
//!                                                 └─ join barrier, then next event
//! ```

use crate::error::{Error, Result};
use crate::traits::Destination;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Capacity of every updater queue
pub const UPDATER_QUEUE_CAPACITY: usize = 10;

/// Producer side of an updater queue
#[derive(Debug, Clone)]
pub struct UpdaterHandle {
    name: &'static str,
    tx: mpsc::Sender<IpAddr>,
}

impl UpdaterHandle {
    /// Name of the destination behind this handle
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Enqueue an address, waiting while the queue is full
    pub async fn submit(&self, address: IpAddr) -> Result<()> {
        self.tx
            .send(address)
            .await
            .map_err(|_| Error::dispatch(format!("updater '{}' has stopped", self.name)))
    }
}

/// Start the worker for a destination
///
/// The worker exits once every [`UpdaterHandle`] is dropped and the queue is
/// drained.
pub fn spawn_updater(destination: Arc<dyn Destination>) -> (UpdaterHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<IpAddr>(UPDATER_QUEUE_CAPACITY);
    let name = destination.name();

    let worker = tokio::spawn(async move {
        debug!(destination = name, "Updater started");

        while let Some(address) = rx.recv().await {
            let report = destination.deliver(address).await;

            if report.is_empty() {
                debug!(destination = name, ip = %address, "No delivery applies to address");
            } else if report.failed > 0 {
                warn!(
                    destination = name,
                    ip = %address,
                    "Batch finished with failures: {}/{} succeeded",
                    report.succeeded,
                    report.attempted
                );
            } else {
                info!(
                    destination = name,
                    ip = %address,
                    "Batch finished: {}/{} succeeded",
                    report.succeeded,
                    report.attempted
                );
            }
        }

        debug!(destination = name, "Updater stopped");
    });

    (UpdaterHandle { name, tx }, worker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::BatchReport;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Collect(Arc<Mutex<Vec<IpAddr>>>);

    #[async_trait]
    impl Destination for Collect {
        fn name(&self) -> &'static str {
            "collect"
        }

        async fn deliver(&self, address: IpAddr) -> BatchReport {
            self.0.lock().unwrap().push(address);
            let mut report = BatchReport::default();
            report.record(true);
            report
        }
    }

    #[tokio::test]
    async fn worker_drains_queue_after_handles_drop() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (handle, worker) = spawn_updater(Arc::new(Collect(seen.clone())));

        for last in 1..=5u8 {
            handle.submit(IpAddr::from([192, 0, 2, last])).await.unwrap();
        }
        drop(handle);
        worker.await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 5);
        assert_eq!(seen[4], IpAddr::from([192, 0, 2, 5]));
    }

    #[tokio::test]
    async fn submit_fails_once_worker_is_gone() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (handle, worker) = spawn_updater(Arc::new(Collect(seen)));

        worker.abort();
        let _ = worker.await;

        assert!(handle.submit(IpAddr::from([192, 0, 2, 1])).await.is_err());
    }

    #[test]
    fn batch_report_counts() {
        let mut report = BatchReport::default();
        assert!(report.is_empty());

        report.record(true);
        report.record(false);

        assert_eq!(
            report,
            BatchReport {
                attempted: 2,
                succeeded: 1,
                failed: 1
            }
        );
    }
}
