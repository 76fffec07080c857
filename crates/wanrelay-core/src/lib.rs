// # wanrelay-core
//
// Core library for the wanrelay address-change fan-out system.
//
// ## Architecture Overview
//
// This library provides the dispatch side of a dynamic-DNS style relay:
// - **address**: IPv6 prefix parsing and prefix + interface-identifier construction
// - **template**: Immutable HTTP delivery templates and their normalization rules
// - **Destination**: Trait for anything that wants to learn about address changes
// - **updater**: One serial worker with a bounded queue per destination
// - **DestinationRegistry**: Ordered set of started updaters
// - **ChangeDispatcher**: Broadcasts every address event to all registered updaters
// - **PollSource**: Timer-driven change detection over a `RouterClient`
// - **DnsProviderDestination**: Adapts a `DnsProvider` to the destination contract
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Detection, dispatch and delivery never share state
// 2. **Backpressure over dropping**: Every queue is bounded and senders wait
// 3. **Per-destination ordering**: One batch in flight per destination
// 4. **Library-First**: The daemon is a thin shell over this crate

pub mod address;
pub mod config;
pub mod dispatcher;
pub mod dns;
pub mod error;
pub mod poll;
pub mod registry;
pub mod template;
pub mod traits;
pub mod updater;

// Re-export core types for convenience
pub use address::{AddressFamily, Ipv6Prefix, PrefixParseError, construct};
pub use dispatcher::{ChangeDispatcher, ChangeSender};
pub use dns::DnsProviderDestination;
pub use error::{Error, Result};
pub use poll::PollSource;
pub use registry::DestinationRegistry;
pub use template::{DeliveryTemplate, TemplateBuilder, TemplateStore};
pub use traits::{BatchReport, Destination, DnsProvider, RouterClient, UpdateResult};
pub use updater::UpdaterHandle;
