//! Utilities for dealing with IP address ranges.

use std::{
    fmt::{self, Display},
    net::{AddrParseError, IpAddr},
    num::ParseIntError,
    str::FromStr,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseSubnetError {
    #[error("invalid address: {0}")]
    Address(#[from] AddrParseError),
    #[error("invalid prefix length: {0}")]
    Prefix(#[from] ParseIntError),
    #[error("prefix length {prefix} is too long for {address}")]
    PrefixTooLong { address: IpAddr, prefix: u8 },
}

/// A subnet in CIDR notation, composed of a base IP address and a prefix length.
///
/// The address is kept as written: `10.0.0.1/8` is not normalized to `10.0.0.0/8`, the kernel
/// applies the mask when matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subnet {
    pub network_address: IpAddr,
    pub netmask: u8,
}

impl Subnet {
    pub fn new(address: IpAddr, mask: u8) -> Result<Self, ParseSubnetError> {
        if mask > max_prefix(&address) {
            return Err(ParseSubnetError::PrefixTooLong { address, prefix: mask });
        }
        Ok(Self { network_address: address, netmask: mask })
    }

    /// A subnet matching exactly one host: /32 for IPv4, /128 for IPv6.
    pub fn host(address: IpAddr) -> Self {
        Self { netmask: max_prefix(&address), network_address: address }
    }

    pub fn is_ipv4(&self) -> bool {
        self.network_address.is_ipv4()
    }
}

fn max_prefix(address: &IpAddr) -> u8 {
    match address {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

impl FromStr for Subnet {
    type Err = ParseSubnetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once('/') {
            Some((address, prefix)) => Self::new(address.parse()?, prefix.parse()?),
            None => Ok(Self::host(s.parse()?)),
        }
    }
}

impl Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network_address, self.netmask)
    }
}
