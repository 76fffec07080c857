//! Shared helpers for the HTTP delivery tests

#![allow(dead_code)]

use std::net::IpAddr;
use std::time::Duration;
use wanrelay_core::template::{DeliveryTemplate, TemplateBuilder};
use wanrelay_http::Backoff;

/// Millisecond backoff so retry tests stay fast
pub fn fast_backoff() -> Backoff {
    Backoff {
        base: Duration::from_millis(1),
        max: Duration::from_millis(5),
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::new()
}

/// Template pointed at `path` on the mock server, no retries
pub fn template(server_uri: &str, path_and_query: &str) -> TemplateBuilder {
    DeliveryTemplate::builder(format!("{}{}", server_uri, path_and_query)).retry_count(0)
}

pub fn ipv4() -> IpAddr {
    "203.0.113.7".parse().unwrap()
}

pub fn ipv6() -> IpAddr {
    "2001:db8::1".parse().unwrap()
}
