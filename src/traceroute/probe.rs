use std::fmt::{Display, Formatter};
use std::net::IpAddr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::trace;

pub use crate::traceroute::error::ProbeError;
use crate::traceroute::geolocation::GeoLocation;

pub mod generator;
pub mod parser;
pub mod transport;

/// One unit of work: the expiry limit to apply and the sequence number that
/// identifies the echo request on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Probe {
    ttl: u8,
    sequence: u16,
}

impl Probe {
    pub fn new(ttl: u8, sequence: u16) -> Self {
        Self { ttl, sequence }
    }

    pub fn ttl(&self) -> u8 {
        self.ttl
    }

    pub fn sequence(&self) -> u16 {
        self.sequence
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeResponse {
    from_address: IpAddr,
}

impl ProbeResponse {
    pub fn new(from_address: IpAddr) -> Self {
        Self { from_address }
    }

    pub fn from_address(&self) -> IpAddr {
        self.from_address
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeReply {
    from_address: IpAddr,
    rtt: Duration,
}

impl ProbeReply {
    pub fn new(from_address: IpAddr, rtt: Duration) -> Self {
        Self { from_address, rtt }
    }

    pub fn from_address(&self) -> IpAddr {
        self.from_address
    }

    pub fn rtt(&self) -> Duration {
        self.rtt
    }
}

/// Create it right before the echo request leaves so that the measured
/// latency covers this probe only.
pub struct CompletableProbe {
    probe: Probe,
    sent_at: Instant,
}

impl CompletableProbe {
    pub fn new(probe: Probe) -> Self {
        Self {
            probe,
            sent_at: Instant::now(),
        }
    }

    pub fn complete(self, probe_response: ProbeResponse) -> ProbeReply {
        let rtt = self.sent_at.elapsed();
        trace!(ttl = self.probe.ttl, sequence = self.probe.sequence, ?rtt, "Probe completed");

        ProbeReply {
            from_address: probe_response.from_address,
            rtt,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    Reply(ProbeReply),
    Timeout,
}

/// Performs exactly one send-and-wait cycle for a probe.
#[async_trait]
pub trait ProbeTransport: Send {
    async fn probe(&mut self, probe: &Probe) -> Result<ProbeOutcome, ProbeError>;
}

#[async_trait]
impl<T: ProbeTransport + ?Sized> ProbeTransport for Box<T> {
    async fn probe(&mut self, probe: &Probe) -> Result<ProbeOutcome, ProbeError> {
        (**self).probe(probe).await
    }
}

/// The recorded outcome of one hop. Never modified once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HopResult {
    hop: u8,
    address: Option<IpAddr>,
    rtt: Option<Duration>,
    location: GeoLocation,
}

impl HopResult {
    pub fn reply(hop: u8, probe_reply: ProbeReply, location: GeoLocation) -> Self {
        Self {
            hop,
            address: Some(probe_reply.from_address),
            rtt: Some(probe_reply.rtt),
            location,
        }
    }

    pub fn timeout(hop: u8) -> Self {
        Self {
            hop,
            address: None,
            rtt: None,
            location: GeoLocation::unknown(),
        }
    }

    pub fn hop(&self) -> u8 {
        self.hop
    }

    pub fn address(&self) -> Option<IpAddr> {
        self.address
    }

    pub fn rtt(&self) -> Option<Duration> {
        self.rtt
    }

    pub fn location(&self) -> &GeoLocation {
        &self.location
    }

    pub fn is_timeout(&self) -> bool {
        self.address.is_none()
    }
}

impl Display for HopResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let hop = self.hop;
        match (self.address, self.rtt) {
            (Some(address), Some(rtt)) => {
                let rtt_ms = rtt.as_secs_f64() * 1000f64;
                write!(f, "{hop} - {address} {rtt_ms:.3} ms {}", self.location)
            },
            _ => write!(f, "{hop} - *"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    #[test]
    fn completed_probe_measures_from_creation() {
        let completable_probe = CompletableProbe::new(Probe::new(1, 1));
        std::thread::sleep(Duration::from_millis(5));
        let from_address = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));

        let probe_reply = completable_probe.complete(ProbeResponse::new(from_address));

        assert_eq!(probe_reply.from_address(), from_address);
        assert!(probe_reply.rtt() >= Duration::from_millis(5));
    }

    #[test]
    fn timeout_hop_carries_placeholders() {
        let hop_result = HopResult::timeout(4);

        assert_eq!(hop_result.hop(), 4);
        assert!(hop_result.is_timeout());
        assert_eq!(hop_result.rtt(), None);
        assert_eq!(hop_result.location(), &GeoLocation::unknown());
        assert_eq!(hop_result.to_string(), "4 - *");
    }

    #[test]
    fn reply_hop_keeps_address_and_latency() {
        let from_address = IpAddr::V4(Ipv4Addr::new(172, 16, 0, 1));
        let probe_reply = ProbeReply::new(from_address, Duration::from_millis(12));
        let location = GeoLocation::new("Germany", "Hesse", "Frankfurt am Main");

        let hop_result = HopResult::reply(2, probe_reply, location.clone());

        assert_eq!(hop_result.address(), Some(from_address));
        assert_eq!(hop_result.rtt(), Some(Duration::from_millis(12)));
        assert_eq!(hop_result.location(), &location);
        assert!(!hop_result.is_timeout());
    }
}
