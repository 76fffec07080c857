//! Address families, IPv6 prefixes and prefix + interface-identifier construction
//!
//! Both the poll path and the push endpoint receive IPv6 *prefixes* from the
//! router when the host address is built locally. [`construct`] turns such a
//! prefix and the configured interface identifier into the full address.

use std::fmt;
use std::net::{IpAddr, Ipv6Addr};
use std::str::FromStr;
use thiserror::Error;

/// IP version of an address
///
/// Derived from the address itself, never stored separately. IPv4-mapped
/// IPv6 addresses (`::ffff:a.b.c.d`) count as IPv4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// Classify an address
    pub fn of(address: &IpAddr) -> Self {
        match address.to_canonical() {
            IpAddr::V4(_) => AddressFamily::V4,
            IpAddr::V6(_) => AddressFamily::V6,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => f.write_str("IPv4"),
            AddressFamily::V6 => f.write_str("IPv6"),
        }
    }
}

/// Combine a network prefix with an interface identifier
///
/// Each of the 16 output bytes is `prefix[i] + interface_id[i]` modulo 256;
/// there is no carry between bytes. The result is the expected
/// "prefix || host" address only while the prefix's host bytes and the
/// identifier's network bytes are zero.
pub fn construct(prefix: Ipv6Addr, interface_id: Ipv6Addr) -> Ipv6Addr {
    let prefix = prefix.octets();
    let interface_id = interface_id.octets();

    let mut octets = [0u8; 16];
    for (i, octet) in octets.iter_mut().enumerate() {
        *octet = prefix[i].wrapping_add(interface_id[i]);
    }

    Ipv6Addr::from(octets)
}

/// Errors returned when parsing an [`Ipv6Prefix`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrefixParseError {
    /// No `/len` suffix
    #[error("missing prefix length in '{0}'")]
    MissingLength(String),

    /// The address part is not an IP address
    #[error("invalid address in '{0}'")]
    InvalidAddress(String),

    /// The address part is an IPv4 address
    #[error("'{0}' is not an IPv6 prefix")]
    NotIpv6(String),

    /// The length is not a number in 0..=128
    #[error("invalid prefix length in '{0}'")]
    InvalidLength(String),
}

/// An IPv6 network in CIDR notation
///
/// The stored address always has its host bits cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv6Prefix {
    network: Ipv6Addr,
    len: u8,
}

impl Ipv6Prefix {
    /// Maximum prefix length
    pub const MAX_LEN: u8 = 128;

    /// Build a prefix, clearing every bit past `len`
    pub fn new(address: Ipv6Addr, len: u8) -> Result<Self, PrefixParseError> {
        if len > Self::MAX_LEN {
            return Err(PrefixParseError::InvalidLength(format!("{}/{}", address, len)));
        }

        let mask = match len {
            0 => 0u128,
            len => u128::MAX << (128 - u32::from(len)),
        };
        let network = Ipv6Addr::from(u128::from(address) & mask);

        Ok(Self { network, len })
    }

    /// The network address (host bits zero)
    pub fn network(&self) -> Ipv6Addr {
        self.network
    }

    /// The prefix length in bits
    pub fn prefix_len(&self) -> u8 {
        self.len
    }

    /// Build the full host address for the given interface identifier
    pub fn with_interface_id(&self, interface_id: Ipv6Addr) -> Ipv6Addr {
        construct(self.network, interface_id)
    }
}

impl fmt::Display for Ipv6Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.len)
    }
}

impl FromStr for Ipv6Prefix {
    type Err = PrefixParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, len) = s
            .split_once('/')
            .ok_or_else(|| PrefixParseError::MissingLength(s.to_string()))?;

        let address: IpAddr = address
            .parse()
            .map_err(|_| PrefixParseError::InvalidAddress(s.to_string()))?;

        let IpAddr::V6(address) = address else {
            return Err(PrefixParseError::NotIpv6(s.to_string()));
        };

        if len.is_empty() || !len.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PrefixParseError::InvalidLength(s.to_string()));
        }
        let len: u8 = len
            .parse()
            .map_err(|_| PrefixParseError::InvalidLength(s.to_string()))?;

        Self::new(address, len).map_err(|_| PrefixParseError::InvalidLength(s.to_string()))
    }
}
