//! Sample and server-identity types for fleet utilization data.
//!
//! A [`Sample`] is one `(timestamp, usage)` observation. Servers are keyed
//! by [`ServerKey`], the canonical 32-bit big-endian encoding of their IPv4
//! address, so the store never hashes or compares address strings on the
//! query path. [`RawRecord`] is one ingestion row with the address still in
//! textual form, as read from a utilization log.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Upper bound of a utilization percentage.
pub const MAX_USAGE: u8 = 100;

/// One CPU utilization observation.
///
/// Immutable once created. Series hold samples sorted ascending by
/// `timestamp`; equal timestamps are legal and kept in ingestion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    /// CPU utilization percentage in `0..=100`.
    pub usage: u8,
}

impl Sample {
    /// Creates a new sample.
    pub const fn new(timestamp: i64, usage: u8) -> Self {
        Self { timestamp, usage }
    }
}

/// Canonical 32-bit key for a server.
///
/// The key is the big-endian encoding of the server's IPv4 address:
/// `a*2^24 + b*2^16 + c*2^8 + d` for `"a.b.c.d"`, with `a` the most
/// significant octet. Encoding and decoding round-trip bit-exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServerKey(u32);

impl ServerKey {
    /// Creates a key directly from its 32-bit encoding.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw 32-bit encoding.
    pub const fn to_bits(self) -> u32 {
        self.0
    }

    /// Returns the address this key encodes.
    pub fn addr(self) -> Ipv4Addr {
        Ipv4Addr::from(self.0)
    }
}

impl From<Ipv4Addr> for ServerKey {
    fn from(addr: Ipv4Addr) -> Self {
        Self(u32::from(addr))
    }
}

impl FromStr for ServerKey {
    type Err = ParseError;

    /// Parses a dotted-quad address: exactly four octets, each in `0..=255`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<Ipv4Addr>()
            .map(Self::from)
            .map_err(|_| ParseError::InvalidIp {
                input: s.to_string(),
            })
    }
}

impl fmt::Display for ServerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.addr().fmt(f)
    }
}

/// One raw ingestion row, as read from a utilization log.
///
/// The server address is still textual; [`SeriesStore::ingest`] parses it
/// into a [`ServerKey`], so a malformed address is an ingestion-time error
/// rather than a parse-time panic.
///
/// [`SeriesStore::ingest`]: crate::store::SeriesStore::ingest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Sample timestamp, seconds since the Unix epoch.
    pub timestamp: i64,
    /// Server IPv4 address in dotted-quad form.
    pub server_ip: String,
    /// CPU index on the server.
    pub cpu: usize,
    /// Utilization percentage.
    pub usage: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_encoding_is_big_endian() {
        let key: ServerKey = "192.168.1.10".parse().unwrap();
        assert_eq!(key.to_bits(), 0xC0A8_010A);

        let key: ServerKey = "1.2.3.4".parse().unwrap();
        assert_eq!(key.to_bits(), (1 << 24) | (2 << 16) | (3 << 8) | 4);

        assert_eq!("0.0.0.0".parse::<ServerKey>().unwrap().to_bits(), 0);
        assert_eq!(
            "255.255.255.255".parse::<ServerKey>().unwrap().to_bits(),
            u32::MAX
        );
    }

    #[test]
    fn key_display_round_trips() {
        for text in ["192.168.1.10", "0.0.0.0", "255.255.255.255", "10.0.42.7"] {
            let key: ServerKey = text.parse().unwrap();
            assert_eq!(key.to_string(), text);
            assert_eq!(key.to_string().parse::<ServerKey>().unwrap(), key);
        }
    }

    #[test]
    fn malformed_addresses_are_rejected() {
        for text in [
            "",
            "1.2.3",
            "1.2.3.4.5",
            "256.0.0.1",
            "1.2.3.-4",
            "a.b.c.d",
            "1.2.3.4 ",
            "192.168.1.10:80",
        ] {
            let err = text.parse::<ServerKey>().unwrap_err();
            assert_eq!(
                err,
                ParseError::InvalidIp {
                    input: text.to_string()
                }
            );
        }
    }

    #[test]
    fn key_from_addr_matches_parse() {
        let addr = Ipv4Addr::new(172, 16, 0, 9);
        assert_eq!(
            ServerKey::from(addr),
            "172.16.0.9".parse::<ServerKey>().unwrap()
        );
        assert_eq!(ServerKey::from(addr).addr(), addr);
    }
}
