//! Single-template HTTP delivery with retries
//!
//! One call to [`deliver`] performs up to `retry_count + 1` attempts. An
//! attempt succeeds on any 2xx response; transport failures, timeouts and
//! non-2xx responses are retried after an exponential backoff. Requests that
//! cannot be built are never sent.

use crate::error::DeliveryError;
use crate::render::{RenderedRequest, render};
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use std::borrow::Cow;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, info, warn};
use wanrelay_core::template::DeliveryTemplate;

/// Maximum number of response body bytes shown in log lines
pub const LOG_BODY_LIMIT: usize = 256;

/// Exponential backoff between attempts
///
/// The delay before retry `n` (0-based) is `min(base * 2^n, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            max: Duration::from_secs(30),
        }
    }
}

impl Backoff {
    /// Delay before retry `retry` (0-based)
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.base.checked_mul(factor).unwrap_or(self.max).min(self.max)
    }
}

/// Terminal outcome of one delivery
#[derive(Debug, Clone)]
pub struct DeliveryResult {
    /// Slot of the template that was delivered
    pub template_index: usize,
    /// Status line of the last response, e.g. `200 OK`; empty without one
    pub status_label: String,
    /// Body of the last response
    pub body: Bytes,
    pub error: Option<DeliveryError>,
    /// HTTP attempts made
    pub attempts: u32,
}

impl DeliveryResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Response body for log lines, cut to [`LOG_BODY_LIMIT`] bytes
    pub fn body_preview(&self) -> Cow<'_, str> {
        if self.body.len() <= LOG_BODY_LIMIT {
            return String::from_utf8_lossy(&self.body);
        }
        let mut preview = String::from_utf8_lossy(&self.body[..LOG_BODY_LIMIT]).into_owned();
        preview.push_str("...");
        Cow::Owned(preview)
    }
}

struct Prepared {
    method: Method,
    url: Url,
    headers: HeaderMap,
}

fn prepare(
    template: &DeliveryTemplate,
    rendered: &RenderedRequest,
) -> Result<Prepared, DeliveryError> {
    let method = Method::from_bytes(template.method.as_bytes()).map_err(|_| {
        DeliveryError::InvalidRequest(format!("invalid method '{}'", template.method))
    })?;

    let url = Url::parse(&rendered.url).map_err(|e| {
        DeliveryError::InvalidRequest(format!("invalid URL '{}': {}", rendered.log_url, e))
    })?;

    let mut headers = HeaderMap::new();
    for (key, value) in &template.headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|_| DeliveryError::InvalidRequest(format!("invalid header name '{}'", key)))?;
        let value = HeaderValue::from_str(value).map_err(|_| {
            DeliveryError::InvalidRequest(format!("invalid value for header '{}'", key))
        })?;
        headers.insert(name, value);
    }

    Ok(Prepared {
        method,
        url,
        headers,
    })
}

fn transport_error(
    error: reqwest::Error,
    template: &DeliveryTemplate,
    rendered: &RenderedRequest,
) -> DeliveryError {
    if error.is_timeout() {
        return DeliveryError::Timeout(template.timeout);
    }
    DeliveryError::Transport(rendered.redact(&error.without_url().to_string()))
}

/// Outcome of a single attempt: status and body if a response arrived
type Attempt = (Option<StatusCode>, Bytes, Option<DeliveryError>);

async fn attempt(
    client: &reqwest::Client,
    template: &DeliveryTemplate,
    rendered: &RenderedRequest,
    prepared: &Prepared,
) -> Attempt {
    let mut request = client
        .request(prepared.method.clone(), prepared.url.clone())
        .timeout(template.timeout);

    if template.use_basic_auth {
        request = request.basic_auth(&template.username, Some(&template.password));
    }
    // configured headers replace the generated Authorization header
    request = request.headers(prepared.headers.clone());

    if !rendered.body.is_empty() {
        request = request.body(rendered.body.clone());
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => return (None, Bytes::new(), Some(transport_error(e, template, rendered))),
    };

    let status = response.status();
    debug!(
        template = template.index,
        "{} {} response status: {}",
        prepared.method,
        rendered.log_url,
        status
    );

    match response.bytes().await {
        Ok(body) if status.is_success() => (Some(status), body, None),
        Ok(body) => (
            Some(status),
            body,
            Some(DeliveryError::Status(status.to_string())),
        ),
        Err(e) if e.is_timeout() => (
            Some(status),
            Bytes::new(),
            Some(DeliveryError::Timeout(template.timeout)),
        ),
        Err(e) if status.is_success() => (
            Some(status),
            Bytes::new(),
            Some(DeliveryError::Read(rendered.redact(&e.without_url().to_string()))),
        ),
        Err(_) => (
            Some(status),
            Bytes::new(),
            Some(DeliveryError::Status(status.to_string())),
        ),
    }
}

/// Deliver `address` with `template`
///
/// Never fails: every outcome, including an unbuildable request, is
/// reported through the returned [`DeliveryResult`].
pub async fn deliver(
    client: &reqwest::Client,
    template: &DeliveryTemplate,
    address: IpAddr,
    backoff: Backoff,
) -> DeliveryResult {
    let rendered = render(template, address);

    info!(
        template = template.index,
        "HTTP request: {} {} [{}]",
        template.method,
        rendered.log_url,
        rendered.log_body
    );

    let mut result = DeliveryResult {
        template_index: template.index,
        status_label: String::new(),
        body: Bytes::new(),
        error: None,
        attempts: 0,
    };

    let prepared = match prepare(template, &rendered) {
        Ok(prepared) => prepared,
        Err(e) => {
            result.error = Some(e);
            return result;
        }
    };

    loop {
        result.attempts += 1;
        let (status, body, error) = attempt(client, template, &rendered, &prepared).await;

        result.status_label = status.map(|s| s.to_string()).unwrap_or_default();
        result.body = body;
        result.error = error;

        let retryable = match &result.error {
            None => return result,
            Some(e) => e.is_retryable(),
        };

        let retries_done = result.attempts - 1;
        if !retryable || retries_done >= template.retry_count {
            return result;
        }

        let delay = backoff.delay(retries_done);
        if let Some(e) = &result.error {
            warn!(
                template = template.index,
                "Attempt {} of {} failed, retrying in {:?}: {}",
                result.attempts,
                template.retry_count + 1,
                delay,
                e
            );
        }
        tokio::time::sleep(delay).await;
    }
}
