//! Configuration loading for the relay
//!
//! Templates are read from indexed keys (`HTTP_REQUEST_<n>_*`). The loader
//! takes a lookup function instead of reading the process environment, so
//! the daemon passes `std::env::var` and tests pass a map.
//!
//! Malformed values never fail the load: each one is replaced by its
//! documented default and a warning is logged.

use crate::error::{Error, Result};
use crate::template::{
    DEFAULT_RETRY_COUNT, DEFAULT_TIMEOUT, DeliveryTemplate, MAX_HEADERS, MAX_TEMPLATES,
    TemplateStore,
};
use std::net::{IpAddr, Ipv6Addr};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Key prefix for delivery templates
pub const TEMPLATE_KEY_PREFIX: &str = "HTTP_REQUEST";

/// Parse a boolean the way Go's `strconv.ParseBool` does
///
/// Accepts `1 t T TRUE true True` and `0 f F FALSE false False`.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Parse a duration string such as `5s`, `1m30s`, `1.5h` or `250ms`
///
/// Units: `ns`, `us` (`µs`), `ms`, `s`, `m`, `h`. A bare `0` is accepted.
/// Negative durations are rejected.
pub fn parse_duration(value: &str) -> Result<Duration> {
    let invalid = || Error::config(format!("invalid duration '{}'", value));

    let mut rest = value.strip_prefix('+').unwrap_or(value);
    if rest.starts_with('-') {
        return Err(Error::config(format!("negative duration '{}'", value)));
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total_nanos = 0f64;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        let (number, tail) = rest.split_at(number_len);
        if number.is_empty() || number == "." {
            return Err(invalid());
        }
        let number: f64 = number.parse().map_err(|_| invalid())?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let unit_nanos = match unit {
            "ns" => 1f64,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return Err(invalid()),
        };

        total_nanos += number * unit_nanos;
        rest = tail;
    }

    if !total_nanos.is_finite() || total_nanos > u64::MAX as f64 {
        return Err(invalid());
    }

    Ok(Duration::from_nanos(total_nanos as u64))
}

/// Parse the local interface identifier used to build IPv6 addresses from prefixes
pub fn parse_interface_id(value: &str) -> Result<Ipv6Addr> {
    match value.trim().parse::<IpAddr>() {
        Ok(IpAddr::V6(address)) if address.to_ipv4_mapped().is_none() => Ok(address),
        Ok(_) => Err(Error::config(format!(
            "interface identifier '{}' is not an IPv6 address",
            value
        ))),
        Err(_) => Err(Error::config(format!(
            "invalid interface identifier '{}'",
            value
        ))),
    }
}

fn template_key(index: usize, field: &str) -> String {
    format!("{}_{}_{}", TEMPLATE_KEY_PREFIX, index, field)
}

/// Read one template slot
///
/// Returns `None` when the slot has no URL.
pub fn load_template<F>(index: usize, lookup: F) -> Option<DeliveryTemplate>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |field: &str| lookup(&template_key(index, field)).filter(|v| !v.is_empty());

    let url = get("URL")?;

    let mut builder = DeliveryTemplate::builder(url).index(index);

    if let Some(method) = get("METHOD") {
        builder = builder.method(method);
    }
    if let Some(body) = get("BODY") {
        builder = builder.body(body);
    }
    builder = builder.credentials(
        get("USERNAME").unwrap_or_default(),
        get("PASSWORD").unwrap_or_default(),
    );

    let flag = |field: &str, default: bool| match get(field) {
        None => default,
        Some(raw) => parse_bool(&raw).unwrap_or_else(|| {
            warn!(
                "Failed to parse {}, using default value {}",
                template_key(index, field),
                default
            );
            default
        }),
    };
    builder = builder
        .basic_auth(flag("BASIC_AUTH", false))
        .on_ipv4(flag("ONIPV4", true))
        .on_ipv6(flag("ONIPV6", false));

    let timeout = match get("TIMEOUT") {
        None => DEFAULT_TIMEOUT,
        Some(raw) => parse_duration(&raw).unwrap_or_else(|e| {
            warn!(
                "Failed to parse {}, using default value {:?}: {}",
                template_key(index, "TIMEOUT"),
                DEFAULT_TIMEOUT,
                e
            );
            DEFAULT_TIMEOUT
        }),
    };
    builder = builder.timeout(timeout);

    let retry_count = match get("RETRY_COUNT") {
        None => DEFAULT_RETRY_COUNT,
        Some(raw) => match raw.trim().parse::<i64>() {
            Ok(count) => u32::try_from(count.max(0)).unwrap_or(u32::MAX),
            Err(e) => {
                warn!(
                    "Failed to parse {}, using default value {}: {}",
                    template_key(index, "RETRY_COUNT"),
                    DEFAULT_RETRY_COUNT,
                    e
                );
                DEFAULT_RETRY_COUNT
            }
        },
    };
    builder = builder.retry_count(retry_count);

    for header in 1..=MAX_HEADERS {
        let key = get(&format!("HEADER_{}_KEY", header));
        let value = get(&format!("HEADER_{}_VALUE", header));
        match (key, value) {
            (Some(key), value) => builder = builder.header(key, value.unwrap_or_default()),
            (None, Some(_)) => warn!(
                "{} set without a key, ignoring",
                template_key(index, &format!("HEADER_{}_VALUE", header))
            ),
            (None, None) => {}
        }
    }

    let template = builder.build();
    if !template.is_enabled() {
        warn!(
            template = index,
            "HTTP request applies to neither IPv4 nor IPv6, it will never run"
        );
    }
    debug!(template = index, ?template, "Loaded HTTP request");

    Some(template)
}

/// Read every template slot `1..=9`, skipping slots without a URL
pub fn load_templates<F>(lookup: F) -> TemplateStore
where
    F: Fn(&str) -> Option<String>,
{
    let store: TemplateStore = (1..=MAX_TEMPLATES)
        .filter_map(|index| load_template(index, &lookup))
        .collect();

    info!("Loaded {} HTTP request template(s)", store.len());
    store
}
