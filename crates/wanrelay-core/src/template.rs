//! HTTP delivery templates
//!
//! A [`DeliveryTemplate`] describes one outbound HTTP callback. Templates are
//! normalized once when they are built and are immutable afterwards; the
//! whole set lives in a [`TemplateStore`] shared by every delivery task.
//!
//! ## Placeholders
//!
//! URL and body may contain alias tokens which are replaced at delivery time:
//!
//! | set | tokens |
//! |----------|--------------------------------------------|
//! | IPv4 | `<ipaddr>`, `<ip4addr>`, `<ipv4addr>` |
//! | IPv6 | `<ip6addr>`, `<ipv6addr>` |
//! | username | `<username>`, `<user>` |
//! | password | `<password>`, `<pass>`, `<passwd>` |

use crate::address::AddressFamily;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Tokens replaced by an IPv4 address
pub const IPV4_ALIASES: &[&str] = &["<ipaddr>", "<ip4addr>", "<ipv4addr>"];

/// Tokens replaced by an IPv6 address
pub const IPV6_ALIASES: &[&str] = &["<ip6addr>", "<ipv6addr>"];

/// Tokens replaced by the template's username
pub const USERNAME_ALIASES: &[&str] = &["<username>", "<user>"];

/// Tokens replaced by the template's password
pub const PASSWORD_ALIASES: &[&str] = &["<password>", "<pass>", "<passwd>"];

/// Default HTTP method
pub const DEFAULT_METHOD: &str = "GET";

/// Default per-attempt timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Lower bound for the per-attempt timeout
pub const MIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Upper bound for the per-attempt timeout
pub const MAX_TIMEOUT: Duration = Duration::from_secs(60);

/// Default number of retries after the first attempt
pub const DEFAULT_RETRY_COUNT: u32 = 7;

/// Upper bound for the number of retries
pub const MAX_RETRY_COUNT: u32 = 14;

/// Highest template slot index
pub const MAX_TEMPLATES: usize = 9;

/// Highest header slot index per template
pub const MAX_HEADERS: usize = 9;

/// Address alias set for a family
pub fn address_aliases(family: AddressFamily) -> &'static [&'static str] {
    match family {
        AddressFamily::V4 => IPV4_ALIASES,
        AddressFamily::V6 => IPV6_ALIASES,
    }
}

/// Whether any token of `aliases` occurs in any of `texts`
pub fn contains_any_alias(texts: &[&str], aliases: &[&str]) -> bool {
    texts
        .iter()
        .any(|text| aliases.iter().any(|alias| text.contains(alias)))
}

/// Resolve the family flags of a template
///
/// `applies_to_v6` wins over `applies_to_v4`. A template that references any
/// IPv4 alias is IPv4-only, otherwise one that references any IPv6 alias is
/// IPv6-only. A template with both flags unset stays disabled.
pub fn resolve_families(
    url: &str,
    body: &str,
    applies_to_v4: bool,
    applies_to_v6: bool,
) -> (bool, bool) {
    let applies_to_v4 = applies_to_v4 && !applies_to_v6;

    if !applies_to_v4 && !applies_to_v6 {
        return (false, false);
    }

    if contains_any_alias(&[url, body], IPV4_ALIASES) {
        (true, false)
    } else if contains_any_alias(&[url, body], IPV6_ALIASES) {
        (false, true)
    } else {
        (applies_to_v4, applies_to_v6)
    }
}

/// One configured HTTP delivery
///
/// Built through [`DeliveryTemplate::builder`]; all invariants hold after
/// `build()`:
/// - `timeout` is within [`MIN_TIMEOUT`, `MAX_TIMEOUT`]
/// - `retry_count` is at most [`MAX_RETRY_COUNT`]
/// - `use_basic_auth` implies a non-empty username and password
/// - at most one of `applies_to_v4` / `applies_to_v6` is set
///
/// # Security
///
/// The Debug implementation does NOT expose the password.
#[derive(Clone, PartialEq, Eq)]
pub struct DeliveryTemplate {
    /// Configuration slot (1-based)
    pub index: usize,
    pub url: String,
    pub method: String,
    pub body: String,
    pub username: String,
    /// ⚠️ NEVER log this value
    pub password: String,
    pub use_basic_auth: bool,
    /// Deadline for each individual attempt
    pub timeout: Duration,
    /// Retries after the first attempt
    pub retry_count: u32,
    /// Lowercased header name to value
    pub headers: BTreeMap<String, String>,
    pub applies_to_v4: bool,
    pub applies_to_v6: bool,
}

impl fmt::Debug for DeliveryTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryTemplate")
            .field("index", &self.index)
            .field("url", &self.url)
            .field("method", &self.method)
            .field("body", &self.body)
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("use_basic_auth", &self.use_basic_auth)
            .field("timeout", &self.timeout)
            .field("retry_count", &self.retry_count)
            .field("headers", &self.headers)
            .field("applies_to_v4", &self.applies_to_v4)
            .field("applies_to_v6", &self.applies_to_v6)
            .finish()
    }
}

impl DeliveryTemplate {
    /// Start building a template for the given URL
    pub fn builder(url: impl Into<String>) -> TemplateBuilder {
        TemplateBuilder::new(url)
    }

    /// Whether an address of `family` should be delivered with this template
    ///
    /// The alias-based family override is re-evaluated here so that a
    /// template is gated the same way no matter how it was constructed.
    pub fn applies_to(&self, family: AddressFamily) -> bool {
        let (v4, v6) = resolve_families(
            &self.url,
            &self.body,
            self.applies_to_v4,
            self.applies_to_v6,
        );
        match family {
            AddressFamily::V4 => v4,
            AddressFamily::V6 => v6,
        }
    }

    /// Whether this template can ever be delivered
    pub fn is_enabled(&self) -> bool {
        self.applies_to(AddressFamily::V4) || self.applies_to(AddressFamily::V6)
    }
}

/// Builder applying defaults and bounds to a [`DeliveryTemplate`]
#[derive(Debug, Clone)]
pub struct TemplateBuilder {
    index: usize,
    url: String,
    method: Option<String>,
    body: String,
    username: String,
    password: String,
    use_basic_auth: bool,
    timeout: Duration,
    retry_count: u32,
    headers: BTreeMap<String, String>,
    applies_to_v4: bool,
    applies_to_v6: bool,
}

impl TemplateBuilder {
    fn new(url: impl Into<String>) -> Self {
        Self {
            index: 1,
            url: url.into(),
            method: None,
            body: String::new(),
            username: String::new(),
            password: String::new(),
            use_basic_auth: false,
            timeout: DEFAULT_TIMEOUT,
            retry_count: DEFAULT_RETRY_COUNT,
            headers: BTreeMap::new(),
            applies_to_v4: true,
            applies_to_v6: false,
        }
    }

    pub fn index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn basic_auth(mut self, enabled: bool) -> Self {
        self.use_basic_auth = enabled;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Add a header; a later value for the same key replaces the earlier one
    ///
    /// Keys are stored lowercased since header names compare case-insensitively.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn on_ipv4(mut self, enabled: bool) -> Self {
        self.applies_to_v4 = enabled;
        self
    }

    pub fn on_ipv6(mut self, enabled: bool) -> Self {
        self.applies_to_v6 = enabled;
        self
    }

    /// Normalize and freeze the template
    pub fn build(self) -> DeliveryTemplate {
        let method = match self.method {
            Some(method) if !method.trim().is_empty() => method.trim().to_string(),
            _ => DEFAULT_METHOD.to_string(),
        };

        let timeout = self.timeout.clamp(MIN_TIMEOUT, MAX_TIMEOUT);
        if timeout != self.timeout {
            warn!(
                template = self.index,
                "Timeout {:?} outside bounds [{:?}, {:?}], using {:?}",
                self.timeout,
                MIN_TIMEOUT,
                MAX_TIMEOUT,
                timeout
            );
        }

        let retry_count = self.retry_count.min(MAX_RETRY_COUNT);
        if retry_count != self.retry_count {
            warn!(
                template = self.index,
                "Retry count {} above maximum {}, using {}",
                self.retry_count,
                MAX_RETRY_COUNT,
                retry_count
            );
        }

        let use_basic_auth =
            self.use_basic_auth && !self.username.is_empty() && !self.password.is_empty();

        let (applies_to_v4, applies_to_v6) =
            resolve_families(&self.url, &self.body, self.applies_to_v4, self.applies_to_v6);

        DeliveryTemplate {
            index: self.index,
            url: self.url,
            method,
            body: self.body,
            username: self.username,
            password: self.password,
            use_basic_auth,
            timeout,
            retry_count,
            headers: self.headers,
            applies_to_v4,
            applies_to_v6,
        }
    }
}

/// Immutable, cheaply cloneable list of delivery templates
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    templates: Arc<[DeliveryTemplate]>,
}

impl TemplateStore {
    /// Freeze a list of templates, keeping their order
    pub fn new(templates: Vec<DeliveryTemplate>) -> Self {
        Self {
            templates: templates.into(),
        }
    }
}

impl Deref for TemplateStore {
    type Target = [DeliveryTemplate];

    fn deref(&self) -> &Self::Target {
        &self.templates
    }
}

impl FromIterator<DeliveryTemplate> for TemplateStore {
    fn from_iter<I: IntoIterator<Item = DeliveryTemplate>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_defaults() {
        let template = DeliveryTemplate::builder("https://x/update").build();

        assert_eq!(template.method, "GET");
        assert_eq!(template.timeout, Duration::from_secs(5));
        assert_eq!(template.retry_count, 7);
        assert!(template.applies_to_v4);
        assert!(!template.applies_to_v6);
        assert!(!template.use_basic_auth);
    }

    #[test]
    fn builder_clamps_bounds() {
        let low = DeliveryTemplate::builder("https://x")
            .timeout(Duration::from_millis(10))
            .build();
        let high = DeliveryTemplate::builder("https://x")
            .timeout(Duration::from_secs(600))
            .retry_count(99)
            .build();

        assert_eq!(low.timeout, MIN_TIMEOUT);
        assert_eq!(high.timeout, MAX_TIMEOUT);
        assert_eq!(high.retry_count, MAX_RETRY_COUNT);
    }

    #[test]
    fn basic_auth_requires_both_credentials() {
        let missing_password = DeliveryTemplate::builder("https://x")
            .credentials("user", "")
            .basic_auth(true)
            .build();
        let complete = DeliveryTemplate::builder("https://x")
            .credentials("user", "secret")
            .basic_auth(true)
            .build();

        assert!(!missing_password.use_basic_auth);
        assert!(complete.use_basic_auth);
    }

    #[test]
    fn header_keys_differing_only_in_case_collapse() {
        let template = DeliveryTemplate::builder("https://x")
            .header("Content-Type", "text/plain")
            .header("content-type", "application/json")
            .build();

        assert_eq!(template.headers.len(), 1);
        assert_eq!(template.headers["content-type"], "application/json");
    }

    #[test]
    fn ipv6_flag_takes_priority() {
        let template = DeliveryTemplate::builder("https://x").on_ipv6(true).build();

        assert!(!template.applies_to_v4);
        assert!(template.applies_to_v6);
    }

    #[test]
    fn alias_override_uses_any_alias_in_the_set() {
        // the first alias of the set must be detected even though later ones are absent
        let v6_by_first_alias = DeliveryTemplate::builder("https://x/?ip=<ip6addr>").build();
        let v6_by_last_alias = DeliveryTemplate::builder("https://x/?ip=<ipv6addr>").build();
        let v4_in_body = DeliveryTemplate::builder("https://x")
            .on_ipv6(true)
            .body("{\"ip\":\"<ipaddr>\"}")
            .build();

        assert!(v6_by_first_alias.applies_to_v6 && !v6_by_first_alias.applies_to_v4);
        assert!(v6_by_last_alias.applies_to_v6 && !v6_by_last_alias.applies_to_v4);
        assert!(v4_in_body.applies_to_v4 && !v4_in_body.applies_to_v6);
    }

    #[test]
    fn ipv4_alias_wins_when_both_families_referenced() {
        let template =
            DeliveryTemplate::builder("https://x/?a=<ip6addr>&b=<ip4addr>").build();

        assert!(template.applies_to(AddressFamily::V4));
        assert!(!template.applies_to(AddressFamily::V6));
    }

    #[test]
    fn disabled_template_is_never_enabled_by_aliases() {
        let template = DeliveryTemplate::builder("https://x/?ip=<ipaddr>")
            .on_ipv4(false)
            .on_ipv6(false)
            .build();

        assert!(!template.is_enabled());
    }

    #[test]
    fn debug_hides_password() {
        let template = DeliveryTemplate::builder("https://x")
            .credentials("user", "hunter2")
            .build();

        let debug = format!("{:?}", template);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<REDACTED>"));
    }

    #[test]
    fn store_keeps_order() {
        let store: TemplateStore = (1..=3)
            .map(|i| DeliveryTemplate::builder(format!("https://x/{}", i)).index(i).build())
            .collect();

        let indices: Vec<usize> = store.iter().map(|t| t.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }
}
