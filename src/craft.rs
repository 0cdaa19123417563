//! Bottom-up construction of ICMP echo requests wrapped in IPv4 and Ethernet.
//!
//! Every builder computes its layer's checksum over the freshly packed header
//! and then lets the layer's [`ErrorPolicy`] decide whether the correct value
//! or a random one goes on the wire.

use std::convert::TryFrom;

use rand::Rng;

use crate::addr::{Ipv4Address, MacAddress};
use crate::error::{Error, Result};
use crate::inject::{ErrorPolicy, ErrorRates};
use crate::packet::{
    self, EthernetHeader, IcmpEchoHeader, Ipv4Header, ETHERNET_HEADER_LEN, ETHER_TYPE_IPV4, FCS_LEN,
    ICMP_HEADER_LEN, IPV4_HEADER_LEN,
};
use crate::util;

const ECHO_REQUEST_V4: u8 = 8;
const IPPROTO_ICMP: u8 = 1;
const DEFAULT_TTL: u8 = 64;
const DONT_FRAGMENT: u16 = 0x4000;
const PAYLOAD_PATTERN: &[u8; 8] = b"BadFrame";
const PAYLOAD_REPEAT: usize = 16;

/// The fixed 128 byte echo payload, identical for every packet.
pub fn echo_payload() -> Vec<u8> {
    PAYLOAD_PATTERN.repeat(PAYLOAD_REPEAT)
}

pub fn build_icmp_echo_request<R: Rng + ?Sized>(
    identifier: u16,
    sequence: u16,
    policy: ErrorPolicy,
    rng: &mut R,
) -> Result<Vec<u8>> {
    let coder = packet::coder();
    let payload = echo_payload();
    let mut header = IcmpEchoHeader {
        message_type: ECHO_REQUEST_V4,
        message_code: 0,
        checksum: 0,
        identifier,
        sequence_num: sequence,
    };

    let mut message = coder.serialize(&header)?;
    message.extend_from_slice(&payload);
    header.checksum = util::internet_checksum(&message, policy, rng);

    let mut message = coder.serialize(&header)?;
    message.extend_from_slice(&payload);
    Ok(message)
}

pub fn build_ipv4_datagram<R: Rng + ?Sized>(
    source: Ipv4Address,
    destination: Ipv4Address,
    icmp: &[u8],
    policy: ErrorPolicy,
    rng: &mut R,
) -> Result<Vec<u8>> {
    let datagram_length = u16::try_from(IPV4_HEADER_LEN + icmp.len())
        .map_err(|_| Error::Oversize(IPV4_HEADER_LEN + icmp.len()))?;
    let coder = packet::coder();
    let mut header = Ipv4Header {
        version_and_header_len: 0x45,
        type_of_service: 0,
        datagram_length,
        ip_identifier: rng.gen(),
        flags_and_frag_offset: DONT_FRAGMENT,
        ttl: DEFAULT_TTL,
        protocol: IPPROTO_ICMP,
        checksum: 0,
        source_ip: source.octets(),
        destination_ip: destination.octets(),
    };

    // Header only, the payload carries its own checksum
    header.checksum = util::internet_checksum(&coder.serialize(&header)?, policy, rng);

    let mut datagram = coder.serialize(&header)?;
    datagram.extend_from_slice(icmp);
    Ok(datagram)
}

pub fn build_ethernet_frame<R: Rng + ?Sized>(
    source: MacAddress,
    destination: MacAddress,
    ipv4: &[u8],
    policy: ErrorPolicy,
    rng: &mut R,
) -> Result<Vec<u8>> {
    let header = EthernetHeader {
        destination: destination.octets(),
        source: source.octets(),
        ether_type: ETHER_TYPE_IPV4,
    };

    let mut frame = packet::coder().serialize(&header)?;
    frame.reserve(ipv4.len() + FCS_LEN);
    frame.extend_from_slice(ipv4);
    let fcs = util::frame_check_sequence(&frame, policy, rng);
    frame.extend_from_slice(&fcs.to_be_bytes());
    Ok(frame)
}

/// Addressing for every frame of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Endpoints {
    pub source_mac: MacAddress,
    pub destination_mac: MacAddress,
    pub source_ip: Ipv4Address,
    pub destination_ip: Ipv4Address,
}

/// Builds the complete frame for sequence number `sequence`.
pub fn build_probe<R: Rng + ?Sized>(
    endpoints: &Endpoints,
    rates: &ErrorRates,
    sequence: u16,
    rng: &mut R,
) -> Result<Vec<u8>> {
    let icmp = build_icmp_echo_request(sequence, sequence, rates.icmp, rng)?;
    let ipv4 = build_ipv4_datagram(endpoints.source_ip, endpoints.destination_ip, &icmp, rates.ip, rng)?;
    build_ethernet_frame(endpoints.source_mac, endpoints.destination_mac, &ipv4, rates.frame, rng)
}

/// Which checksums of a frame fail verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameReport {
    pub bad_fcs: bool,
    pub bad_ip: bool,
    pub bad_icmp: bool,
}

impl FrameReport {
    pub fn is_clean(&self) -> bool {
        !(self.bad_fcs || self.bad_ip || self.bad_icmp)
    }

    pub fn corrupted_layers(&self) -> Vec<&'static str> {
        let mut layers = Vec::new();
        if self.bad_fcs {
            layers.push("frame");
        }
        if self.bad_ip {
            layers.push("ip");
        }
        if self.bad_icmp {
            layers.push("icmp");
        }
        layers
    }
}

/// Re-checks the three checksums of a frame laid out by [`build_probe`].
///
/// Returns `None` when the frame is too short to hold all three headers.
pub fn inspect_frame(frame: &[u8]) -> Option<FrameReport> {
    let min_len = ETHERNET_HEADER_LEN + IPV4_HEADER_LEN + ICMP_HEADER_LEN + FCS_LEN;
    if frame.len() < min_len {
        return None;
    }

    let (body, fcs) = frame.split_at(frame.len() - FCS_LEN);
    let fcs = u32::from_be_bytes([fcs[0], fcs[1], fcs[2], fcs[3]]);
    let ip_header = &body[ETHERNET_HEADER_LEN..ETHERNET_HEADER_LEN + IPV4_HEADER_LEN];
    let icmp = &body[ETHERNET_HEADER_LEN + IPV4_HEADER_LEN..];

    Some(FrameReport {
        bad_fcs: crc32fast::hash(body) != fcs,
        bad_ip: !util::verify_internet_checksum(ip_header),
        bad_icmp: !util::verify_internet_checksum(icmp),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn endpoints() -> Endpoints {
        Endpoints {
            source_mac: "01:02:03:04:05:06".parse().unwrap(),
            destination_mac: "aa:bb:cc:dd:ee:ff".parse().unwrap(),
            source_ip: "192.168.1.1".parse().unwrap(),
            destination_ip: "192.168.1.2".parse().unwrap(),
        }
    }

    #[test]
    fn payload_is_fixed_pattern() {
        let payload = echo_payload();
        assert_eq!(payload.len(), 128);
        assert_eq!(&payload[..8], b"BadFrame");
        assert_eq!(&payload[120..], b"BadFrame");
    }

    #[test]
    fn icmp_echo_request_verifies() {
        let mut rng = StdRng::seed_from_u64(0);
        let icmp = build_icmp_echo_request(0, 0, ErrorPolicy::NEVER, &mut rng).unwrap();
        assert_eq!(icmp.len(), 136);
        assert_eq!(&icmp[..2], &[8, 0]);
        assert!(util::verify_internet_checksum(&icmp));
        assert_eq!(&icmp[8..], &echo_payload()[..]);
    }

    #[test]
    fn icmp_carries_identifier_and_sequence() {
        let mut rng = StdRng::seed_from_u64(0);
        let icmp = build_icmp_echo_request(0x0102, 0x0304, ErrorPolicy::NEVER, &mut rng).unwrap();
        let header: IcmpEchoHeader = packet::coder().deserialize(&icmp).unwrap();
        assert_eq!(header.identifier, 0x0102);
        assert_eq!(header.sequence_num, 0x0304);
        assert!(util::verify_internet_checksum(&icmp));
    }

    #[test]
    fn ipv4_datagram_layout() {
        let mut rng = StdRng::seed_from_u64(1);
        let ep = endpoints();
        let icmp = build_icmp_echo_request(0, 0, ErrorPolicy::NEVER, &mut rng).unwrap();
        let datagram = build_ipv4_datagram(ep.source_ip, ep.destination_ip, &icmp, ErrorPolicy::NEVER, &mut rng).unwrap();

        assert_eq!(datagram.len(), 156);
        let header: Ipv4Header = packet::coder().deserialize(&datagram).unwrap();
        assert_eq!(header.version_and_header_len, 0x45);
        assert_eq!(header.datagram_length, 156);
        assert_eq!(header.flags_and_frag_offset, 0x4000);
        assert_eq!(header.ttl, 64);
        assert_eq!(header.protocol, 1);
        assert_eq!(header.source_ip, [192, 168, 1, 1]);
        assert_eq!(header.destination_ip, [192, 168, 1, 2]);
        assert!(util::verify_internet_checksum(&datagram[..IPV4_HEADER_LEN]));
        assert_eq!(&datagram[IPV4_HEADER_LEN..], &icmp[..]);
    }

    #[test]
    fn ipv4_rejects_payload_past_total_length_field() {
        let mut rng = StdRng::seed_from_u64(8);
        let ep = endpoints();

        let largest = vec![0u8; 65535 - IPV4_HEADER_LEN];
        let datagram = build_ipv4_datagram(ep.source_ip, ep.destination_ip, &largest, ErrorPolicy::NEVER, &mut rng).unwrap();
        assert_eq!(datagram.len(), 65535);
        assert_eq!(u16::from_be_bytes([datagram[2], datagram[3]]), 65535);

        let too_large = vec![0u8; 65536 - IPV4_HEADER_LEN];
        let result = build_ipv4_datagram(ep.source_ip, ep.destination_ip, &too_large, ErrorPolicy::NEVER, &mut rng);
        assert!(matches!(result, Err(Error::Oversize(65536))));
    }

    #[test]
    fn ipv4_identification_varies() {
        let mut rng = StdRng::seed_from_u64(5);
        let ep = endpoints();
        let ids: Vec<u16> = (0..8)
            .map(|_| {
                let d = build_ipv4_datagram(ep.source_ip, ep.destination_ip, &[], ErrorPolicy::NEVER, &mut rng).unwrap();
                u16::from_be_bytes([d[4], d[5]])
            })
            .collect();
        assert!(ids.iter().any(|id| *id != ids[0]));
    }

    #[test]
    fn ethernet_frame_layout() {
        let mut rng = StdRng::seed_from_u64(2);
        let ep = endpoints();
        let ipv4 = vec![0x5a; 156];
        let frame = build_ethernet_frame(ep.source_mac, ep.destination_mac, &ipv4, ErrorPolicy::NEVER, &mut rng).unwrap();

        // 6 + 6 + 2 + 156 + 4
        assert_eq!(frame.len(), 174);
        assert_eq!(&frame[..6], &[0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
        assert_eq!(&frame[6..12], &[1, 2, 3, 4, 5, 6]);
        assert_eq!(&frame[12..14], &[0x08, 0x00]);
        assert_eq!(&frame[14..170], &ipv4[..]);
        assert_eq!(&frame[170..], &crc32fast::hash(&frame[..170]).to_be_bytes());
    }

    #[test]
    fn clean_probe_inspects_clean() {
        let mut rng = StdRng::seed_from_u64(9);
        let frame = build_probe(&endpoints(), &ErrorRates::default(), 3, &mut rng).unwrap();
        assert_eq!(frame.len(), 174);
        let report = inspect_frame(&frame).unwrap();
        assert!(report.is_clean());
        assert!(report.corrupted_layers().is_empty());
    }

    #[test]
    fn always_rates_corrupt_every_layer() {
        let mut rng = StdRng::seed_from_u64(4);
        let rates = ErrorRates { frame: ErrorPolicy::ALWAYS, ip: ErrorPolicy::ALWAYS, icmp: ErrorPolicy::ALWAYS };
        let corrupted = (0..200u16)
            .filter_map(|n| inspect_frame(&build_probe(&endpoints(), &rates, n, &mut rng).unwrap()))
            .filter(|report| report.bad_fcs && report.bad_ip && report.bad_icmp)
            .count();
        assert!(corrupted >= 195, "only {} of 200 fully corrupted", corrupted);
    }

    #[test]
    fn single_layer_corruption_leaves_others_intact() {
        let mut rng = StdRng::seed_from_u64(6);
        let rates = ErrorRates { ip: ErrorPolicy::ALWAYS, ..ErrorRates::default() };
        for n in 0..50u16 {
            let report = inspect_frame(&build_probe(&endpoints(), &rates, n, &mut rng).unwrap()).unwrap();
            assert!(!report.bad_fcs);
            assert!(!report.bad_icmp);
        }
    }

    #[test]
    fn seeded_runs_reproduce() {
        let rates = ErrorRates {
            frame: ErrorPolicy::new(0.3).unwrap(),
            ip: ErrorPolicy::new(0.3).unwrap(),
            icmp: ErrorPolicy::new(0.3).unwrap(),
        };
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        for n in 0..20u16 {
            assert_eq!(
                build_probe(&endpoints(), &rates, n, &mut a).unwrap(),
                build_probe(&endpoints(), &rates, n, &mut b).unwrap()
            );
        }
    }

    #[test]
    fn short_frame_is_not_inspected() {
        assert!(inspect_frame(&[0u8; 20]).is_none());
    }
}
