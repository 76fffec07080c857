//! Placeholder substitution
//!
//! Substitution order matters: the address aliases are replaced first, the
//! result is kept as the log-safe form, and only then are the username and
//! password aliases replaced.

use std::net::IpAddr;
use wanrelay_core::address::AddressFamily;
use wanrelay_core::template::{
    DeliveryTemplate, PASSWORD_ALIASES, USERNAME_ALIASES, address_aliases,
};

/// A template resolved for one address
#[derive(Clone, PartialEq, Eq)]
pub struct RenderedRequest {
    /// Fully resolved URL, may contain credentials
    pub url: String,
    /// Fully resolved body, may contain credentials
    pub body: String,
    /// URL with the address filled in but credential tokens untouched
    pub log_url: String,
    /// Body with the address filled in but credential tokens untouched
    pub log_body: String,
}

impl std::fmt::Debug for RenderedRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderedRequest")
            .field("url", &self.log_url)
            .field("body", &self.log_body)
            .finish()
    }
}

impl RenderedRequest {
    /// Replace the resolved URL in `message` with its log-safe form
    pub fn redact(&self, message: &str) -> String {
        if self.url.is_empty() || self.url == self.log_url {
            return message.to_string();
        }
        message.replace(&self.url, &self.log_url)
    }
}

fn replace_all(text: &str, aliases: &[&str], value: &str) -> String {
    aliases
        .iter()
        .fold(text.to_string(), |acc, alias| acc.replace(alias, value))
}

/// Resolve `template` for `address`
///
/// IPv4-mapped IPv6 addresses are written in dotted IPv4 form.
pub fn render(template: &DeliveryTemplate, address: IpAddr) -> RenderedRequest {
    let address = address.to_canonical();
    let text = address.to_string();
    let aliases = address_aliases(AddressFamily::of(&address));

    let log_url = replace_all(&template.url, aliases, &text);
    let log_body = replace_all(&template.body, aliases, &text);

    let credentials = |s: &str| {
        let s = replace_all(s, USERNAME_ALIASES, &template.username);
        replace_all(&s, PASSWORD_ALIASES, &template.password)
    };

    RenderedRequest {
        url: credentials(&log_url),
        body: credentials(&log_body),
        log_url,
        log_body,
    }
}
