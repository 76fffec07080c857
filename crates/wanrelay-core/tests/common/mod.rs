//! Test doubles shared by the contract tests
//!
//! The doubles record what the core asks of them and nothing more.

#![allow(dead_code)]

use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use wanrelay_core::error::{Error, Result};
use wanrelay_core::traits::{BatchReport, Destination, DnsProvider, RouterClient, UpdateResult};
use wanrelay_core::Ipv6Prefix;

/// One observation made by a [`RecordingDestination`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Start(&'static str, IpAddr),
    End(&'static str, IpAddr),
}

/// Shared, ordered log of marks across destinations
pub type MarkLog = Arc<Mutex<Vec<Mark>>>;

pub fn mark_log() -> MarkLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Destination that logs the start and end of every batch
pub struct RecordingDestination {
    name: &'static str,
    delay: Duration,
    log: MarkLog,
}

impl RecordingDestination {
    pub fn new(name: &'static str, delay: Duration, log: MarkLog) -> Self {
        Self { name, delay, log }
    }
}

#[async_trait]
impl Destination for RecordingDestination {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn deliver(&self, address: IpAddr) -> BatchReport {
        self.log.lock().unwrap().push(Mark::Start(self.name, address));
        tokio::time::sleep(self.delay).await;
        self.log.lock().unwrap().push(Mark::End(self.name, address));

        let mut report = BatchReport::default();
        report.record(true);
        report
    }
}

/// Addresses whose batch finished for `name`, in order
pub fn delivered(log: &MarkLog, name: &str) -> Vec<IpAddr> {
    log.lock()
        .unwrap()
        .iter()
        .filter_map(|mark| match mark {
            Mark::End(n, address) if *n == name => Some(*address),
            _ => None,
        })
        .collect()
}

/// Destination whose batches block until the test opens the gate
pub struct GatedDestination {
    gate: Arc<Semaphore>,
    delivered: Arc<AtomicUsize>,
}

impl GatedDestination {
    pub fn new() -> (Self, Arc<Semaphore>, Arc<AtomicUsize>) {
        let gate = Arc::new(Semaphore::new(0));
        let delivered = Arc::new(AtomicUsize::new(0));
        let destination = Self {
            gate: Arc::clone(&gate),
            delivered: Arc::clone(&delivered),
        };
        (destination, gate, delivered)
    }
}

#[async_trait]
impl Destination for GatedDestination {
    fn name(&self) -> &'static str {
        "gated"
    }

    async fn deliver(&self, _address: IpAddr) -> BatchReport {
        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
        self.delivered.fetch_add(1, Ordering::SeqCst);
        BatchReport::default()
    }
}

/// Router double with values the test can change between polls
///
/// `None` makes the corresponding call fail.
#[derive(Default)]
pub struct MockRouter {
    pub ipv4: Mutex<Option<Ipv4Addr>>,
    pub ipv6: Mutex<Option<Ipv6Addr>>,
    pub prefix: Mutex<Option<Ipv6Prefix>>,
    pub calls: AtomicUsize,
}

impl MockRouter {
    pub fn set_ipv4(&self, value: Option<Ipv4Addr>) {
        *self.ipv4.lock().unwrap() = value;
    }

    pub fn set_ipv6(&self, value: Option<Ipv6Addr>) {
        *self.ipv6.lock().unwrap() = value;
    }

    pub fn set_prefix(&self, value: Option<&str>) {
        *self.prefix.lock().unwrap() = value.map(|v| v.parse().unwrap());
    }
}

#[async_trait]
impl RouterClient for MockRouter {
    async fn wan_ipv4(&self) -> Result<Ipv4Addr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (*self.ipv4.lock().unwrap()).ok_or_else(|| Error::router("router unreachable"))
    }

    async fn wan_ipv6(&self) -> Result<Ipv6Addr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (*self.ipv6.lock().unwrap()).ok_or_else(|| Error::router("router unreachable"))
    }

    async fn ipv6_prefix(&self) -> Result<Ipv6Prefix> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (*self.prefix.lock().unwrap()).ok_or_else(|| Error::router("router unreachable"))
    }
}

/// DNS provider double with scripted failures
pub struct MockDnsProvider {
    /// Number of leading calls that still fail
    remaining_failures: AtomicUsize,
    always_fail: bool,
    updated_records: Mutex<Vec<(String, IpAddr)>>,
    update_call_count: AtomicUsize,
}

impl MockDnsProvider {
    pub fn new() -> Self {
        Self::failing_first(0)
    }

    pub fn failing_first(failures: usize) -> Self {
        Self {
            remaining_failures: AtomicUsize::new(failures),
            always_fail: false,
            updated_records: Mutex::new(Vec::new()),
            update_call_count: AtomicUsize::new(0),
        }
    }

    pub fn always_failing() -> Self {
        Self {
            always_fail: true,
            ..Self::new()
        }
    }

    pub fn update_call_count(&self) -> usize {
        self.update_call_count.load(Ordering::SeqCst)
    }

    /// Successful updates, sorted by record name
    pub fn updated_records(&self) -> Vec<(String, IpAddr)> {
        let mut records = self.updated_records.lock().unwrap().clone();
        records.sort();
        records
    }
}

#[async_trait]
impl DnsProvider for MockDnsProvider {
    async fn update_record(&self, record_name: &str, new_ip: IpAddr) -> Result<UpdateResult> {
        self.update_call_count.fetch_add(1, Ordering::SeqCst);

        let scripted_failure = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if self.always_fail || scripted_failure {
            return Err(Error::dns_provider("simulated API failure"));
        }

        self.updated_records
            .lock()
            .unwrap()
            .push((record_name.to_string(), new_ip));
        Ok(UpdateResult::Updated { previous_ip: None })
    }

    fn provider_name(&self) -> &'static str {
        "mock-dns"
    }
}

pub fn v4(last: u8) -> IpAddr {
    IpAddr::from([203, 0, 113, last])
}
