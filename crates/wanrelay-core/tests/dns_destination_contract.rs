//! Contract Test: DNS Provider Destination
//!
//! Constraints verified:
//! - Only records of the address family are updated
//! - Failed updates are retried a bounded number of times
//! - A destination without records is rejected

mod common;

use common::*;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use wanrelay_core::{Destination, DnsProviderDestination};

fn records(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[tokio::test]
async fn updates_records_of_matching_family() {
    let provider = Arc::new(MockDnsProvider::new());
    let destination = DnsProviderDestination::new(
        provider.clone(),
        records(&["a.example.com", "b.example.com"]),
        records(&["c.example.com"]),
    )
    .unwrap();

    let report = destination.deliver(v4(1)).await;

    assert_eq!(report.attempted, 2);
    assert_eq!(report.succeeded, 2);
    assert_eq!(
        provider.updated_records(),
        vec![
            ("a.example.com".to_string(), v4(1)),
            ("b.example.com".to_string(), v4(1)),
        ]
    );

    let v6: IpAddr = "2001:db8::1".parse().unwrap();
    let report = destination.deliver(v6).await;
    assert_eq!(report.succeeded, 1);
}

#[tokio::test]
async fn family_without_records_is_a_no_op() {
    let provider = Arc::new(MockDnsProvider::new());
    let destination =
        DnsProviderDestination::new(provider.clone(), records(&["a.example.com"]), Vec::new())
            .unwrap();

    let report = destination.deliver("2001:db8::1".parse().unwrap()).await;

    assert!(report.is_empty());
    assert_eq!(provider.update_call_count(), 0);
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let provider = Arc::new(MockDnsProvider::failing_first(2));
    let destination =
        DnsProviderDestination::new(provider.clone(), records(&["a.example.com"]), Vec::new())
            .unwrap()
            .with_retry(3, Duration::from_millis(1));

    let report = destination.deliver(v4(1)).await;

    assert_eq!(report.succeeded, 1);
    assert_eq!(provider.update_call_count(), 3);
}

#[tokio::test]
async fn retries_are_bounded() {
    let provider = Arc::new(MockDnsProvider::always_failing());
    let destination =
        DnsProviderDestination::new(provider.clone(), records(&["a.example.com"]), Vec::new())
            .unwrap()
            .with_retry(2, Duration::from_millis(1));

    let report = destination.deliver(v4(1)).await;

    assert_eq!(report.failed, 1);
    assert_eq!(provider.update_call_count(), 3);
}

#[test]
fn destination_without_records_is_rejected() {
    let provider = Arc::new(MockDnsProvider::new());
    assert!(DnsProviderDestination::new(provider, Vec::new(), Vec::new()).is_err());
}
