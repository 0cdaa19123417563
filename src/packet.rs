use serde::{Deserialize, Serialize};

pub const ETHER_TYPE_IPV4: u16 = 0x0800;
pub const ETHERNET_HEADER_LEN: usize = 14;
pub const FCS_LEN: usize = 4;
pub const IPV4_HEADER_LEN: usize = 20;
pub const ICMP_HEADER_LEN: usize = 8;

/// Wire records are packed field by field, big endian, with no length prefixes.
pub fn coder() -> bincode::Config {
    let mut coder = bincode::config();
    coder.big_endian();
    coder
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct IcmpEchoHeader {
    pub message_type: u8,
    pub message_code: u8,
    pub checksum: u16,
    pub identifier: u16,
    pub sequence_num: u16,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Ipv4Header {
    pub version_and_header_len: u8,
    pub type_of_service: u8,
    pub datagram_length: u16,
    pub ip_identifier: u16,
    pub flags_and_frag_offset: u16, // flags are the top 3 bits
    pub ttl: u8,
    pub protocol: u8,
    pub checksum: u16,
    pub source_ip: [u8; 4],
    pub destination_ip: [u8; 4],
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct EthernetHeader {
    pub destination: [u8; 6],
    pub source: [u8; 6],
    pub ether_type: u16,
}
