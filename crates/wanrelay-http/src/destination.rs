//! HTTP callbacks as a relay destination

use crate::client::{Backoff, DeliveryResult, deliver};
use async_trait::async_trait;
use std::net::IpAddr;
use tokio::task::JoinSet;
use tracing::{debug, error, info};
use wanrelay_core::address::AddressFamily;
use wanrelay_core::template::TemplateStore;
use wanrelay_core::traits::{BatchReport, Destination};
use wanrelay_core::{Error, Result};

/// Runs every configured HTTP template for each address event
///
/// All templates that apply to the address family are delivered
/// concurrently. `deliver` returns once every one of them has reached a
/// terminal result; the results are then logged in template order.
#[derive(Debug, Clone)]
pub struct HttpRequestsDestination {
    templates: TemplateStore,
    client: reqwest::Client,
    backoff: Backoff,
}

impl HttpRequestsDestination {
    /// Create a destination for `templates`
    ///
    /// Fails when there is nothing to deliver, so the updater is never
    /// started.
    pub fn new(templates: TemplateStore) -> Result<Self> {
        if templates.is_empty() {
            return Err(Error::config("no HTTP requests configured"));
        }

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            templates,
            client,
            backoff: Backoff::default(),
        })
    }

    /// Override the delay between retries
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }
}

fn log_result(result: &DeliveryResult) {
    match &result.error {
        None => info!(
            template = result.template_index,
            attempts = result.attempts,
            "HTTP request {} result: [{}] {}",
            result.template_index,
            result.status_label,
            result.body_preview()
        ),
        Some(e) if result.status_label.is_empty() => error!(
            template = result.template_index,
            attempts = result.attempts,
            "HTTP request {} failed: {}",
            result.template_index,
            e
        ),
        Some(e) => error!(
            template = result.template_index,
            attempts = result.attempts,
            "HTTP request {} failed: [{}] {}",
            result.template_index,
            result.status_label,
            e
        ),
    }
}

#[async_trait]
impl Destination for HttpRequestsDestination {
    fn name(&self) -> &'static str {
        "http_requests"
    }

    async fn deliver(&self, address: IpAddr) -> BatchReport {
        let family = AddressFamily::of(&address);
        info!(ip = %address, "Received address change, executing all HTTP requests");

        let mut tasks = JoinSet::new();
        for (position, template) in self.templates.iter().enumerate() {
            if !template.applies_to(family) {
                debug!(template = template.index, "HTTP request does not apply to {}", family);
                continue;
            }

            let templates = self.templates.clone();
            let client = self.client.clone();
            let backoff = self.backoff;
            tasks.spawn(async move {
                deliver(&client, &templates[position], address, backoff).await
            });
        }

        let mut results = Vec::with_capacity(tasks.len());
        let mut report = BatchReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => {
                    error!("HTTP request task failed: {}", e);
                    report.record(false);
                }
            }
        }

        results.sort_by_key(|result| result.template_index);
        for result in &results {
            log_result(result);
            report.record(result.is_success());
        }

        report
    }
}
