use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A 6-byte hardware (MAC) address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const ZERO: MacAddr = MacAddr([0; 6]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 6]
    }
}

/// Renders as uppercase colon-hex, matching the HTTP JSON body in §6.
impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid MAC address string: {0}")]
pub struct MacParseError(String);

impl FromStr for MacAddr {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 6 {
            return Err(MacParseError(s.to_string()));
        }
        for (i, p) in parts.iter().enumerate() {
            bytes[i] = u8::from_str_radix(p, 16).map_err(|_| MacParseError(s.to_string()))?;
        }
        Ok(MacAddr(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_uppercase_colon_hex() {
        let mac = MacAddr([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x01]);
        assert_eq!(mac.to_string(), "AA:BB:CC:DD:EE:01");
    }

    #[test]
    fn round_trips_through_from_str() {
        let mac = MacAddr([0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
        let parsed: MacAddr = mac.to_string().parse().unwrap();
        assert_eq!(mac, parsed);
    }

    #[test]
    fn zero_mac_is_zero() {
        assert!(MacAddr::ZERO.is_zero());
        assert!(!MacAddr([1, 0, 0, 0, 0, 0]).is_zero());
    }

    #[test]
    fn rejects_malformed_string() {
        assert!("not-a-mac".parse::<MacAddr>().is_err());
        assert!("AA:BB:CC".parse::<MacAddr>().is_err());
    }
}
