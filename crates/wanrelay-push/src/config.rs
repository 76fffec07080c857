//! Push endpoint settings

use crate::auth::Credentials;
use std::fmt;
use std::net::Ipv6Addr;
use tracing::warn;

/// Authentication and address construction settings
#[derive(Clone, Default)]
pub struct PushConfig {
    credentials: Credentials,
    basic_auth: bool,
    interface_id: Option<Ipv6Addr>,
}

impl fmt::Debug for PushConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushConfig")
            .field("credentials", &self.credentials)
            .field("basic_auth", &self.basic_auth)
            .field("interface_id", &self.interface_id)
            .finish()
    }
}

impl PushConfig {
    /// Basic auth is turned off when either credential is empty
    pub fn new(username: impl Into<String>, password: impl Into<String>, basic_auth: bool) -> Self {
        let credentials = Credentials::new(username, password);

        let complete = !credentials.username.is_empty() && !credentials.password.is_empty();
        if basic_auth && !complete {
            warn!("Basic auth requested without username and password, using query parameters");
        }

        Self {
            credentials,
            basic_auth: basic_auth && complete,
            interface_id: None,
        }
    }

    /// Build IPv6 addresses from pushed prefixes with `interface_id`
    pub fn with_interface_id(mut self, interface_id: Ipv6Addr) -> Self {
        self.interface_id = Some(interface_id);
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn basic_auth(&self) -> bool {
        self.basic_auth
    }

    pub fn interface_id(&self) -> Option<Ipv6Addr> {
        self.interface_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_auth_needs_both_credentials() {
        assert!(PushConfig::new("user", "pass", true).basic_auth());
        assert!(!PushConfig::new("user", "", true).basic_auth());
        assert!(!PushConfig::new("", "pass", true).basic_auth());
        assert!(!PushConfig::new("user", "pass", false).basic_auth());
    }

    #[test]
    fn debug_hides_password() {
        let config = PushConfig::new("user", "hunter2", true);
        assert!(!format!("{:?}", config).contains("hunter2"));
    }
}
