use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::traceroute::async_socket::AsyncSocket;
use crate::traceroute::error::{ProbeError, TracerouteError};
use crate::traceroute::probe::{CompletableProbe, Probe, ProbeOutcome, ProbeResponse, ProbeTransport};
use crate::traceroute::probe::parser::IcmpProbeResponseParser;
use crate::traceroute::utils;
use crate::traceroute::utils::packet_utils;

/// Sends ICMP echo requests over a raw IPv4 socket opened for each probe.
pub struct IcmpProbeTransport {
    destination_address: IpAddr,
    max_wait_probe: Duration,
    icmp_id: u16,
    probe_response_parser: IcmpProbeResponseParser,
}

impl IcmpProbeTransport {
    const BUFFER_SIZE: usize = 1024;

    /// Fails when raw ICMPv4 sockets cannot be opened here, which no later
    /// probe could recover from.
    pub fn new(destination_address: IpAddr, max_wait_probe: Duration) -> Result<Self, TracerouteError> {
        if !destination_address.is_ipv4() {
            return Err(TracerouteError::TransportConstruction {
                target: destination_address,
                source: io::Error::new(io::ErrorKind::Unsupported, "only IPv4 targets can be probed"),
            });
        }

        if let Err(error) = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4)) {
            return Err(TracerouteError::TransportConstruction {
                target: destination_address,
                source: error,
            });
        }

        let icmp_id = utils::generate_u16();
        debug!(%destination_address, icmp_id, "ICMP probe transport ready");

        Ok(Self {
            destination_address,
            max_wait_probe,
            icmp_id,
            probe_response_parser: IcmpProbeResponseParser::new(icmp_id),
        })
    }

    fn build_socket() -> io::Result<AsyncSocket> {
        AsyncSocket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))
    }

    async fn send_ping(&self, socket: &AsyncSocket, probe: &Probe) -> io::Result<CompletableProbe> {
        socket.set_ttl(probe.ttl() as u32)?;

        let echo_request_bytes = packet_utils::build_icmpv4_echo_request_bytes(self.icmp_id, probe.sequence());
        let socket_addr = SocketAddr::new(self.destination_address, 0);

        let completable_probe = CompletableProbe::new(*probe);
        socket.send_to(&echo_request_bytes, socket_addr).await?;

        Ok(completable_probe)
    }

    async fn wait_probe_response(&self, socket: &AsyncSocket, probe: &Probe) -> io::Result<ProbeResponse> {
        let mut buffer = [0u8; Self::BUFFER_SIZE];
        loop {
            let size = socket.recv(&mut buffer).await?;

            if let Some(probe_response) = self.probe_response_parser.parse_bytes(&buffer[..size], probe) {
                break Ok(probe_response);
            }

            trace!(ttl = probe.ttl(), size, "Ignoring unrelated ICMP packet");
        }
    }
}

#[async_trait]
impl ProbeTransport for IcmpProbeTransport {
    async fn probe(&mut self, probe: &Probe) -> Result<ProbeOutcome, ProbeError> {
        let ttl = probe.ttl();
        let socket = Self::build_socket()
            .map_err(|error| ProbeError::from_open_error(ttl, error))?;

        let completable_probe = self.send_ping(&socket, probe)
            .await
            .map_err(|source| ProbeError::Io { ttl, source })?;

        match timeout(self.max_wait_probe, self.wait_probe_response(&socket, probe)).await {
            Ok(Ok(probe_response)) => Ok(ProbeOutcome::Reply(completable_probe.complete(probe_response))),
            Ok(Err(source)) => Err(ProbeError::Io { ttl, source }),
            Err(_) => Ok(ProbeOutcome::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv6Addr;

    use super::*;

    #[test]
    fn ipv6_target_is_rejected_at_construction() {
        let target = IpAddr::V6(Ipv6Addr::LOCALHOST);

        let error = match IcmpProbeTransport::new(target, Duration::from_secs(2)) {
            Ok(_) => panic!("IPv6 target accepted"),
            Err(error) => error,
        };

        assert!(matches!(error, TracerouteError::TransportConstruction { target: t, .. } if t == target));
    }
}
