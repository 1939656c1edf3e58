use pnet::packet::FromPacket;
use pnet::packet::icmp::{Icmp, IcmpCode, IcmpPacket, IcmpType};
use pnet::packet::icmp::echo_reply::{EchoReply, EchoReplyPacket};
use pnet::packet::icmp::echo_request::{EchoRequest, EchoRequestPacket};
use pnet::packet::ipv4::{Ipv4, Ipv4Packet};

use crate::traceroute::utils::bytes::ToBytes;

/// Size of an echo request on the wire, ICMP header included.
pub const ECHO_REQUEST_LENGTH: usize = 32;

// Type, code and checksum; pnet's `Icmp` payload starts right after them.
const ICMP_BASE_HEADER_LENGTH: usize = 4;
const ICMP_ERROR_UNUSED_LENGTH: usize = 4;

pub fn build_ipv4_datagram_from_bytes(data: &[u8]) -> Option<Ipv4> {
    let ipv4_packet = Ipv4Packet::new(data)?;
    Some(ipv4_packet.from_packet())
}

pub fn build_icmpv4_packet_from_bytes(data: &[u8]) -> Option<Icmp> {
    let icmp_packet = IcmpPacket::new(data)?;
    Some(icmp_packet.from_packet())
}

pub fn build_echo_reply_from_bytes(data: &[u8]) -> Option<EchoReply> {
    let echo_reply_packet = EchoReplyPacket::new(data)?;
    Some(echo_reply_packet.from_packet())
}

pub fn is_icmp_ttl_expired(icmp_packet: &Icmp) -> bool {
    let icmp_type = icmp_packet.icmp_type.0;
    let icmp_code = icmp_packet.icmp_code.0;
    icmp_type == 11 && icmp_code == 0
}

pub fn is_icmp_destination_unreachable(icmp_packet: &Icmp) -> bool {
    icmp_packet.icmp_type.0 == 3
}

pub fn is_icmp_echo_reply(icmp_packet: &Icmp) -> bool {
    let icmp_type = icmp_packet.icmp_type.0;
    let icmp_code = icmp_packet.icmp_code.0;
    icmp_type == 0 && icmp_code == 0
}

/// ICMP errors quote the offending datagram after four unused bytes:
/// its IPv4 header (options included) followed by at least eight bytes
/// of the original ICMP message.
pub fn extract_icmp_ping_from_icmp_error_response(icmp_packet: &Icmp) -> Option<EchoRequest> {
    let quoted_datagram = icmp_packet.payload.get(ICMP_ERROR_UNUSED_LENGTH..)?;
    let quoted_ipv4_header = Ipv4Packet::new(quoted_datagram)?;
    let quoted_header_length = quoted_ipv4_header.get_header_length() as usize * 4;

    let echo_request_packet = EchoRequestPacket::new(quoted_datagram.get(quoted_header_length..)?)?;
    Some(echo_request_packet.from_packet())
}

pub fn build_icmpv4_echo_request(id: u16, sqn: u16) -> Icmp {
    let mut payload = vec![0u8; ECHO_REQUEST_LENGTH - ICMP_BASE_HEADER_LENGTH];
    payload[0..2].copy_from_slice(id.to_be_bytes().as_ref());
    payload[2..4].copy_from_slice(sqn.to_be_bytes().as_ref());
    Icmp {
        icmp_type: IcmpType(8),
        icmp_code: IcmpCode(0),
        checksum: 0,
        payload,
    }
}

pub fn icmpv4_checksum(icmp: &Icmp) -> u16 {
    let icmp_bytes = icmp.to_bytes();
    pnet::packet::util::checksum(&icmp_bytes, 1)
}

/// Wire bytes of a checksummed echo request.
pub fn build_icmpv4_echo_request_bytes(id: u16, sqn: u16) -> Vec<u8> {
    let mut echo_request = build_icmpv4_echo_request(id, sqn);
    echo_request.checksum = icmpv4_checksum(&echo_request);
    echo_request.to_bytes()
}
