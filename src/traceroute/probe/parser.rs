use std::net::IpAddr;

use pnet::packet::icmp::Icmp;
use pnet::packet::ipv4::Ipv4;

use crate::traceroute::probe::{Probe, ProbeResponse};
use crate::traceroute::utils::packet_utils;

/// Matches raw ICMP traffic against the echo request of one probe.
pub struct IcmpProbeResponseParser {
    icmp_id: u16,
}

impl IcmpProbeResponseParser {
    pub fn new(icmp_id: u16) -> Self {
        Self { icmp_id }
    }

    /// Parses bytes read from a raw ICMPv4 socket (IPv4 header included).
    pub fn parse_bytes(&self, data: &[u8], probe: &Probe) -> Option<ProbeResponse> {
        let ipv4_datagram = packet_utils::build_ipv4_datagram_from_bytes(data)?;
        let icmp_packet = packet_utils::build_icmpv4_packet_from_bytes(&ipv4_datagram.payload)?;
        self.parse(&icmp_packet, &ipv4_datagram, probe)
    }

    pub fn parse(&self, icmp_packet: &Icmp, ipv4_datagram: &Ipv4, probe: &Probe) -> Option<ProbeResponse> {
        let from_address = IpAddr::V4(ipv4_datagram.source);
        let (icmp_id, icmp_sqn) = if packet_utils::is_icmp_echo_reply(icmp_packet) {
            let echo_reply = packet_utils::build_echo_reply_from_bytes(&ipv4_datagram.payload)?;
            (echo_reply.identifier, echo_reply.sequence_number)
        } else if packet_utils::is_icmp_ttl_expired(icmp_packet)
            || packet_utils::is_icmp_destination_unreachable(icmp_packet) {
            let ping_request = packet_utils::extract_icmp_ping_from_icmp_error_response(icmp_packet)?;
            (ping_request.identifier, ping_request.sequence_number)
        } else {
            return None;
        };

        if icmp_id != self.icmp_id || icmp_sqn != probe.sequence() {
            return None;
        }

        Some(ProbeResponse::new(from_address))
    }
}
