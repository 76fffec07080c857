//! Core traits for the relay
//!
//! This module defines the seams between the core and its collaborators.
//!
//! - [`Destination`]: Anything that should learn about address changes
//! - [`DnsProvider`]: Update DNS records via provider APIs
//! - [`RouterClient`]: Read the WAN addresses from the upstream router

pub mod destination;
pub mod dns_provider;
pub mod router;

pub use destination::{BatchReport, Destination};
pub use dns_provider::{DnsProvider, UpdateResult};
pub use router::RouterClient;
