//! Change dispatcher
//!
//! The dispatcher owns the single upstream queue. Each address taken from it
//! is submitted to every registered updater in registration order.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │ PollSource  │──┐
//! └─────────────┘  │   ChangeSender
//! ┌─────────────┐  ├──────────────► [ queue (10) ] ──► ChangeDispatcher
//! │ Push server │──┘                                        │
//! └─────────────┘                       ┌───────────────────┴───────────┐
//!                                       ▼                               ▼
//!                                ┌──────────────┐               ┌──────────────┐
//!                                │ DNS updater  │               │ HTTP updater │
//!                                └──────────────┘               └──────────────┘
//! ```
//!
//! ## Backpressure
//!
//! Submitting waits only for an updater's queue to accept the event, never
//! for its batch to finish. A full updater queue stalls the dispatcher, and
//! a full upstream queue stalls the producers.

use crate::error::{Error, Result};
use crate::registry::DestinationRegistry;
use std::net::IpAddr;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info};

/// Capacity of the upstream queue
pub const DISPATCH_QUEUE_CAPACITY: usize = 10;

/// Producer handle for address changes
///
/// Given to the push endpoint and the poll source. Deduplication is the
/// producer's job; every address sent here is broadcast.
#[derive(Debug, Clone)]
pub struct ChangeSender {
    tx: mpsc::Sender<IpAddr>,
}

impl ChangeSender {
    /// Enqueue an address change, waiting while the queue is full
    ///
    /// IPv4-mapped IPv6 addresses are converted to plain IPv4 first.
    pub async fn send(&self, address: IpAddr) -> Result<()> {
        self.tx
            .send(address.to_canonical())
            .await
            .map_err(|_| Error::dispatch("dispatcher has stopped"))
    }
}

/// Broadcasts address changes to every registered updater
pub struct ChangeDispatcher {
    rx: mpsc::Receiver<IpAddr>,
    registry: DestinationRegistry,
}

impl ChangeDispatcher {
    /// Create a dispatcher over `registry` and the first producer handle
    pub fn new(registry: DestinationRegistry) -> (Self, ChangeSender) {
        let (tx, rx) = mpsc::channel(DISPATCH_QUEUE_CAPACITY);
        (Self { rx, registry }, ChangeSender { tx })
    }

    /// Run until every [`ChangeSender`] is dropped
    pub async fn run(self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run until every [`ChangeSender`] is dropped or `shutdown_rx` fires
    ///
    /// Events still waiting in the upstream queue at shutdown are discarded;
    /// events already accepted by an updater are delivered before this
    /// returns.
    pub async fn run_with_shutdown(self, shutdown_rx: oneshot::Receiver<()>) -> Result<()> {
        self.run_internal(Some(shutdown_rx)).await
    }

    async fn run_internal(self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        let Self { rx, registry } = self;

        if registry.is_empty() {
            info!("No destinations registered, address changes will only be logged");
        } else {
            info!(
                "Dispatcher started with destinations: {}",
                registry.names().join(", ")
            );
        }

        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(shutdown);

        let mut events = ReceiverStream::new(rx);

        loop {
            tokio::select! {
                event = events.next() => match event {
                    Some(address) => broadcast(&registry, address).await,
                    None => {
                        debug!("All change senders dropped");
                        break;
                    }
                },

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        registry.shutdown().await;
        info!("Dispatcher stopped");

        Ok(())
    }
}

async fn broadcast(registry: &DestinationRegistry, address: IpAddr) {
    info!(ip = %address, "Address change received");

    for handle in registry.handles() {
        debug!(destination = handle.name(), ip = %address, "Submitting address");
        if let Err(e) = handle.submit(address).await {
            error!(destination = handle.name(), "Failed to submit address: {}", e);
        }
    }
}
