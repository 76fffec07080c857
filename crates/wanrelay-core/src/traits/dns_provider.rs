//! DNS provider trait
//!
//! A provider knows how to point one named record at an address through its
//! API. Nothing provider-specific ships with the workspace; any
//! implementation is driven by [`crate::dns::DnsProviderDestination`], which
//! owns the per-family record lists and the retry policy.

use async_trait::async_trait;
use std::net::IpAddr;

/// What a successful record update changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateResult {
    /// The record pointed elsewhere and was rewritten
    Updated { previous_ip: Option<IpAddr> },
    /// The record already held the address
    Unchanged,
    /// The record did not exist and was added
    Created,
}

/// Record updates against one provider API
///
/// One call is one API round trip. Calling it twice with the same address
/// must yield [`UpdateResult::Unchanged`] the second time.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    async fn update_record(
        &self,
        record_name: &str,
        new_ip: IpAddr,
    ) -> Result<UpdateResult, crate::Error>;

    /// Name used in logs and as the destination name
    fn provider_name(&self) -> &'static str;
}
