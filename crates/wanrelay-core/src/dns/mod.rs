//! DNS provider destination
//!
//! Adapts a [`DnsProvider`] to the [`Destination`] contract. Every address
//! event updates all records configured for the address family, each record
//! in its own task, and the batch ends when the last of them has finished.
//!
//! Failed updates are retried a fixed number of times with a fixed delay.

use crate::address::AddressFamily;
use crate::error::{Error, Result};
use crate::traits::{BatchReport, Destination, DnsProvider, UpdateResult};
use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Default number of retries per record
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Default delay between retries
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Updates DNS records through a provider
pub struct DnsProviderDestination {
    provider: Arc<dyn DnsProvider>,
    ipv4_records: Vec<String>,
    ipv6_records: Vec<String>,
    max_retries: usize,
    retry_delay: Duration,
}

impl DnsProviderDestination {
    /// Create a destination for the given per-family record names
    ///
    /// Fails when both lists are empty, so the updater is never started.
    pub fn new(
        provider: Arc<dyn DnsProvider>,
        ipv4_records: Vec<String>,
        ipv6_records: Vec<String>,
    ) -> Result<Self> {
        if ipv4_records.is_empty() && ipv6_records.is_empty() {
            return Err(Error::config(format!(
                "no DNS records configured for provider '{}'",
                provider.provider_name()
            )));
        }

        Ok(Self {
            provider,
            ipv4_records,
            ipv6_records,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    /// Override the retry policy
    pub fn with_retry(mut self, max_retries: usize, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    fn records_for(&self, family: AddressFamily) -> &[String] {
        match family {
            AddressFamily::V4 => &self.ipv4_records,
            AddressFamily::V6 => &self.ipv6_records,
        }
    }
}

#[async_trait]
impl Destination for DnsProviderDestination {
    fn name(&self) -> &'static str {
        self.provider.provider_name()
    }

    async fn deliver(&self, address: IpAddr) -> BatchReport {
        let records = self.records_for(AddressFamily::of(&address));
        let mut tasks = JoinSet::new();

        for record in records {
            let provider = Arc::clone(&self.provider);
            let record = record.clone();
            let (max_retries, retry_delay) = (self.max_retries, self.retry_delay);

            tasks.spawn(async move {
                update_record_with_retry(
                    provider.as_ref(),
                    &record,
                    address,
                    max_retries,
                    retry_delay,
                )
                .await
            });
        }

        let mut report = BatchReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => report.record(outcome.is_ok()),
                Err(e) => {
                    error!("DNS update task failed: {}", e);
                    report.record(false);
                }
            }
        }

        report
    }
}

async fn update_record_with_retry(
    provider: &dyn DnsProvider,
    record_name: &str,
    new_ip: IpAddr,
    max_retries: usize,
    retry_delay: Duration,
) -> Result<()> {
    let mut attempt = 0;

    loop {
        let error = match provider.update_record(record_name, new_ip).await {
            Ok(UpdateResult::Updated { previous_ip }) => {
                info!(
                    "Updated {} -> {} (previous: {:?})",
                    record_name, new_ip, previous_ip
                );
                return Ok(());
            }
            Ok(UpdateResult::Unchanged) => {
                debug!("Record {} unchanged", record_name);
                return Ok(());
            }
            Ok(UpdateResult::Created) => {
                info!("Created record {} -> {}", record_name, new_ip);
                return Ok(());
            }
            Err(e) => e,
        };

        if attempt >= max_retries {
            error!(
                "Giving up on {} after {} attempt(s): {}",
                record_name,
                attempt + 1,
                error
            );
            return Err(Error::provider(provider.provider_name(), error.to_string()));
        }

        warn!(
            "Update attempt {} failed for {}, retrying in {:?}: {}",
            attempt + 1,
            record_name,
            retry_delay,
            error
        );
        attempt += 1;
        tokio::time::sleep(retry_delay).await;
    }
}
