// # Destination Trait
//
// A destination receives address events one at a time from its updater
// worker. For every event it runs all of its applicable deliveries, waits
// for each of them to finish, and reports a summary.
//
// ## Implementations
//
// - HTTP callbacks: `wanrelay-http` crate
// - DNS provider records: [`crate::dns::DnsProviderDestination`]

use async_trait::async_trait;
use std::net::IpAddr;

/// Outcome of one delivery batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Deliveries started for the event
    pub attempted: usize,
    /// Deliveries that reached a successful terminal result
    pub succeeded: usize,
    /// Deliveries that gave up
    pub failed: usize,
}

impl BatchReport {
    /// Record one terminal result
    pub fn record(&mut self, success: bool) {
        self.attempted += 1;
        if success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    /// Whether nothing applied to the event
    pub fn is_empty(&self) -> bool {
        self.attempted == 0
    }
}

/// A system that should learn about address changes
///
/// # Contract
///
/// - `deliver` returns only after every delivery it started has reached a
///   terminal result (join barrier)
/// - `deliver` never fails: errors are logged and counted in the report
/// - The updater worker never calls `deliver` concurrently on the same
///   destination
#[async_trait]
pub trait Destination: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Deliver one address to every applicable target
    async fn deliver(&self, address: IpAddr) -> BatchReport;
}
