//! Timer-driven change detection
//!
//! The poll source asks a [`RouterClient`] for the WAN addresses on every
//! tick and forwards only values that differ from the last ones it sent.
//!
//! With an interface identifier configured, the router's delegated prefix
//! is tracked instead of its own IPv6 address, and the forwarded address is
//! the prefix combined with the identifier.

use crate::address::construct;
use crate::dispatcher::ChangeSender;
use crate::error::Result;
use crate::traits::RouterClient;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Polling interval used when none is configured
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(300);

/// Polls a router and feeds changes to the dispatcher
pub struct PollSource {
    router: Arc<dyn RouterClient>,
    sender: ChangeSender,
    interval: Duration,
    interface_id: Option<Ipv6Addr>,
    last_v4: Option<Ipv4Addr>,
    /// Last router IPv6 address, or last prefix network in prefix mode
    last_v6: Option<Ipv6Addr>,
}

impl PollSource {
    pub fn new(router: Arc<dyn RouterClient>, sender: ChangeSender, interval: Duration) -> Self {
        Self {
            router,
            sender,
            interval,
            interface_id: None,
            last_v4: None,
            last_v6: None,
        }
    }

    /// Track the delegated prefix and build addresses with `interface_id`
    pub fn with_interface_id(mut self, interface_id: Ipv6Addr) -> Self {
        self.interface_id = Some(interface_id);
        self
    }

    /// Poll the router once
    ///
    /// Router errors are logged and skipped. Returns the number of addresses
    /// forwarded; fails only if the dispatcher has stopped.
    pub async fn poll_once(&mut self) -> Result<usize> {
        debug!("Polling WAN addresses from router");
        let mut forwarded = 0;

        match self.router.wan_ipv4().await {
            Ok(ipv4) if self.last_v4 != Some(ipv4) => {
                info!(ip = %ipv4, "New WAN IPv4 found");
                self.sender.send(IpAddr::V4(ipv4)).await?;
                self.last_v4 = Some(ipv4);
                forwarded += 1;
            }
            Ok(_) => {}
            Err(e) => warn!("Failed to poll WAN IPv4 from router: {}", e),
        }

        match self.interface_id {
            None => match self.router.wan_ipv6().await {
                Ok(ipv6) if self.last_v6 != Some(ipv6) => {
                    info!(ip = %ipv6, "New WAN IPv6 found");
                    self.sender.send(IpAddr::V6(ipv6)).await?;
                    self.last_v6 = Some(ipv6);
                    forwarded += 1;
                }
                Ok(_) => {}
                Err(e) => warn!("Failed to poll WAN IPv6 from router: {}", e),
            },
            Some(interface_id) => match self.router.ipv6_prefix().await {
                Ok(prefix) if self.last_v6 != Some(prefix.network()) => {
                    let address = construct(prefix.network(), interface_id);
                    info!(%prefix, ip = %address, "New IPv6 prefix found");
                    self.sender.send(IpAddr::V6(address)).await?;
                    self.last_v6 = Some(prefix.network());
                    forwarded += 1;
                }
                Ok(_) => {}
                Err(e) => warn!("Failed to poll IPv6 prefix from router: {}", e),
            },
        }

        Ok(forwarded)
    }

    /// Poll immediately, then on every interval tick until `shutdown_rx` fires
    pub async fn run(mut self, shutdown_rx: oneshot::Receiver<()>) -> Result<()> {
        // a zero period would panic in tokio::time::interval
        let period = if self.interval.is_zero() {
            DEFAULT_POLL_INTERVAL
        } else {
            self.interval
        };
        info!("Polling router every {:?}", period);

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown_rx);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.poll_once().await {
                        warn!("Stopping poll source: {}", e);
                        return Err(e);
                    }
                }

                _ = &mut shutdown_rx => {
                    debug!("Poll source shutting down");
                    return Ok(());
                }
            }
        }
    }
}
