//! Destination registry
//!
//! The registry owns the updater of every destination that started
//! successfully. The dispatcher forwards events to them in registration
//! order.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wanrelay_core::{ChangeDispatcher, DestinationRegistry};
//!
//! let mut registry = DestinationRegistry::new();
//! registry.register(Arc::new(dns_destination));
//! registry.register(Arc::new(http_destination));
//!
//! let (dispatcher, sender) = ChangeDispatcher::new(registry);
//! ```

use crate::traits::Destination;
use crate::updater::{UpdaterHandle, spawn_updater};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Ordered set of running destination updaters
#[derive(Default)]
pub struct DestinationRegistry {
    handles: Vec<UpdaterHandle>,
    workers: Vec<JoinHandle<()>>,
}

impl DestinationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the updater for `destination` and append it
    ///
    /// Must be called from within a tokio runtime.
    pub fn register(&mut self, destination: Arc<dyn Destination>) {
        let (handle, worker) = spawn_updater(destination);
        info!(destination = handle.name(), "Registered destination");

        self.handles.push(handle);
        self.workers.push(worker);
    }

    /// Updater handles in registration order
    pub fn handles(&self) -> &[UpdaterHandle] {
        &self.handles
    }

    /// Destination names in registration order
    pub fn names(&self) -> Vec<&'static str> {
        self.handles.iter().map(UpdaterHandle::name).collect()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Close every queue and wait for the workers to drain them
    pub async fn shutdown(self) {
        let Self { handles, workers } = self;
        drop(handles);

        debug!("Waiting for {} updater(s) to drain", workers.len());
        for worker in workers {
            if let Err(e) = worker.await {
                error!("Updater task failed: {}", e);
            }
        }
        info!("All updaters stopped");
    }
}
