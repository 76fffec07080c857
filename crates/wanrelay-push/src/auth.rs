//! Credential extraction and comparison

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use base64::prelude::*;
use std::fmt;

/// Username and password supplied by a caller
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &"<REDACTED>")
            .field("password", &"<REDACTED>")
            .finish()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Compare both fields in constant time
    ///
    /// Both comparisons always run, whatever the outcome of the first.
    pub fn matches(&self, expected: &Credentials) -> bool {
        let username = constant_time_eq(self.username.as_bytes(), expected.username.as_bytes());
        let password = constant_time_eq(self.password.as_bytes(), expected.password.as_bytes());
        username & password
    }
}

/// Compare two byte strings without stopping at the first difference
///
/// Only the lengths are allowed to leak.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Read credentials from an `Authorization: Basic ...` header
///
/// Returns `None` for a missing or malformed header.
pub fn basic_credentials(headers: &HeaderMap) -> Option<Credentials> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = BASE64_STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;

    Some(Credentials::new(username, password))
}
