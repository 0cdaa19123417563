use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::{AddressKind, FormatError};

/// Parse `aa:bb:cc:dd:ee:ff` into its six octets.
pub fn mac_to_bytes(text: &str) -> Result<[u8; 6], FormatError> {
    let groups: Vec<&str> = text.split(':').collect();
    if groups.len() != 6 {
        return Err(FormatError::new(AddressKind::Mac, text, "expected 6 colon-separated groups"));
    }

    let mut octets = [0u8; 6];
    for (octet, group) in octets.iter_mut().zip(groups) {
        // from_str_radix alone would accept a leading '+'
        if group.is_empty() || group.len() > 2 || !group.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(FormatError::new(AddressKind::Mac, text, "group is not a hexadecimal byte"));
        }
        *octet = u8::from_str_radix(group, 16)
            .map_err(|_| FormatError::new(AddressKind::Mac, text, "group is not a hexadecimal byte"))?;
    }
    Ok(octets)
}

/// Parse dotted-decimal `a.b.c.d` into its four octets.
pub fn ipv4_to_bytes(text: &str) -> Result<[u8; 4], FormatError> {
    if text.split('.').count() != 4 {
        return Err(FormatError::new(AddressKind::Ipv4, text, "expected 4 dot-separated octets"));
    }
    Ipv4Addr::from_str(text)
        .map(|ip| ip.octets())
        .map_err(|_| FormatError::new(AddressKind::Ipv4, text, "octet is not a decimal number in 0..=255"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for MacAddress {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        mac_to_bytes(s).map(MacAddress)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", a, b, c, d, e, g)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Address(pub [u8; 4]);

impl Ipv4Address {
    pub fn octets(&self) -> [u8; 4] {
        self.0
    }
}

impl FromStr for Ipv4Address {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ipv4_to_bytes(s).map(Ipv4Address)
    }
}

impl From<Ipv4Addr> for Ipv4Address {
    fn from(ip: Ipv4Addr) -> Self {
        Ipv4Address(ip.octets())
    }
}

impl From<Ipv4Address> for Ipv4Addr {
    fn from(ip: Ipv4Address) -> Self {
        Ipv4Addr::from(ip.0)
    }
}

impl fmt::Display for Ipv4Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{}.{}.{}.{}", a, b, c, d)
    }
}
