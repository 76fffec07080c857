//! Router client trait
//!
//! The poll source asks the upstream router for its current WAN addresses on
//! a timer. Talking to a concrete router is left to implementations.

use crate::address::Ipv6Prefix;
use async_trait::async_trait;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Read-only view of the router's WAN side
#[async_trait]
pub trait RouterClient: Send + Sync {
    /// Current public IPv4 address
    async fn wan_ipv4(&self) -> Result<Ipv4Addr, crate::Error>;

    /// Current public IPv6 address of the router itself
    async fn wan_ipv6(&self) -> Result<Ipv6Addr, crate::Error>;

    /// Delegated IPv6 prefix
    async fn ipv6_prefix(&self) -> Result<Ipv6Prefix, crate::Error>;
}
