use std::net::IpAddr;
use std::time::Duration;

use crate::Traceroute;
use crate::traceroute::error::TracerouteError;
use crate::traceroute::geolocation::{GeoLocator, NoopGeoLocator};
use crate::traceroute::probe::ProbeTransport;
use crate::traceroute::probe::transport::IcmpProbeTransport;

/// Knobs of a trace, handed to the engine at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceConfig {
    pub max_ttl: u8,
    pub max_wait_probe: Duration,
    pub initial_sequence_number: u16,
}

impl TraceConfig {
    pub const DEFAULT_MAX_TTL: u8 = 30;
    pub const DEFAULT_MAX_WAIT_PROBE: Duration = Duration::from_secs(2);
    pub const DEFAULT_ISN: u16 = 1;

    pub fn validate(&self) -> Result<(), TracerouteError> {
        if self.max_ttl == 0 {
            return Err(TracerouteError::InvalidConfig(String::from("max ttl must be at least 1")));
        }

        if self.max_wait_probe.is_zero() {
            return Err(TracerouteError::InvalidConfig(String::from("probe wait must be greater than zero")));
        }

        Ok(())
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            max_ttl: Self::DEFAULT_MAX_TTL,
            max_wait_probe: Self::DEFAULT_MAX_WAIT_PROBE,
            initial_sequence_number: Self::DEFAULT_ISN,
        }
    }
}

pub struct TracerouteBuilder;

impl TracerouteBuilder {
    pub fn icmp() -> TracerouteIcmpBuilder<NoopGeoLocator> {
        TracerouteIcmpBuilder::new(TracerouteBaseBuilder::new(NoopGeoLocator))
    }

    /// Builds the engine around any probe transport, e.g. a simulated one.
    pub fn with_transport<T: ProbeTransport>(transport: T) -> TracerouteTransportBuilder<T, NoopGeoLocator> {
        TracerouteTransportBuilder {
            traceroute_base_builder: TracerouteBaseBuilder::new(NoopGeoLocator),
            transport,
        }
    }
}

struct TracerouteBaseBuilder<G: GeoLocator> {
    target_ip_address: Option<IpAddr>,
    config: TraceConfig,
    geo_locator: G,
}

impl<G: GeoLocator> TracerouteBaseBuilder<G> {
    fn new(geo_locator: G) -> Self {
        Self {
            target_ip_address: None,
            config: TraceConfig::default(),
            geo_locator,
        }
    }

    fn target_ip_address(&mut self, ip_addr: IpAddr) {
        self.target_ip_address = Some(ip_addr);
    }

    fn max_ttl(&mut self, max_ttl: u8) {
        self.config.max_ttl = max_ttl;
    }

    fn max_wait_probe(&mut self, max_wait_probe: Duration) {
        self.config.max_wait_probe = max_wait_probe;
    }

    fn initial_sequence_number(&mut self, isn: u16) {
        self.config.initial_sequence_number = isn;
    }

    fn geo_locator<N: GeoLocator>(self, geo_locator: N) -> TracerouteBaseBuilder<N> {
        TracerouteBaseBuilder {
            target_ip_address: self.target_ip_address,
            config: self.config,
            geo_locator,
        }
    }

    fn validated_target(&self) -> Result<IpAddr, TracerouteError> {
        let target_ip_address = self.target_ip_address
            .ok_or_else(|| TracerouteError::InvalidConfig(String::from("Target ip address required!")))?;
        self.config.validate()?;
        Ok(target_ip_address)
    }

    fn build<T: ProbeTransport>(self, target_ip_address: IpAddr, transport: T) -> Traceroute<T, G> {
        Traceroute::new(target_ip_address, self.config, transport, self.geo_locator)
    }
}

pub struct TracerouteIcmpBuilder<G: GeoLocator> {
    traceroute_base_builder: TracerouteBaseBuilder<G>,
}

impl<G: GeoLocator> TracerouteIcmpBuilder<G> {
    fn new(traceroute_base_builder: TracerouteBaseBuilder<G>) -> Self {
        Self { traceroute_base_builder }
    }

    pub fn target_ip_address(mut self, ip_addr: IpAddr) -> Self {
        self.traceroute_base_builder.target_ip_address(ip_addr);
        self
    }

    pub fn max_ttl(mut self, max_ttl: u8) -> Self {
        self.traceroute_base_builder.max_ttl(max_ttl);
        self
    }

    pub fn max_wait_probe(mut self, max_wait_probe: Duration) -> Self {
        self.traceroute_base_builder.max_wait_probe(max_wait_probe);
        self
    }

    pub fn initial_sequence_number(mut self, isn: u16) -> Self {
        self.traceroute_base_builder.initial_sequence_number(isn);
        self
    }

    pub fn geo_locator<N: GeoLocator>(self, geo_locator: N) -> TracerouteIcmpBuilder<N> {
        TracerouteIcmpBuilder::new(self.traceroute_base_builder.geo_locator(geo_locator))
    }

    /// Fails with [`TracerouteError::TransportConstruction`] when raw ICMP
    /// sockets are not available to this process.
    pub fn build(self) -> Result<Traceroute<IcmpProbeTransport, G>, TracerouteError> {
        let target_ip_address = self.traceroute_base_builder.validated_target()?;
        let max_wait_probe = self.traceroute_base_builder.config.max_wait_probe;
        let transport = IcmpProbeTransport::new(target_ip_address, max_wait_probe)?;

        Ok(self.traceroute_base_builder.build(target_ip_address, transport))
    }
}

pub struct TracerouteTransportBuilder<T: ProbeTransport, G: GeoLocator> {
    traceroute_base_builder: TracerouteBaseBuilder<G>,
    transport: T,
}

impl<T: ProbeTransport, G: GeoLocator> TracerouteTransportBuilder<T, G> {
    pub fn target_ip_address(mut self, ip_addr: IpAddr) -> Self {
        self.traceroute_base_builder.target_ip_address(ip_addr);
        self
    }

    pub fn max_ttl(mut self, max_ttl: u8) -> Self {
        self.traceroute_base_builder.max_ttl(max_ttl);
        self
    }

    pub fn max_wait_probe(mut self, max_wait_probe: Duration) -> Self {
        self.traceroute_base_builder.max_wait_probe(max_wait_probe);
        self
    }

    pub fn initial_sequence_number(mut self, isn: u16) -> Self {
        self.traceroute_base_builder.initial_sequence_number(isn);
        self
    }

    pub fn geo_locator<N: GeoLocator>(self, geo_locator: N) -> TracerouteTransportBuilder<T, N> {
        TracerouteTransportBuilder {
            traceroute_base_builder: self.traceroute_base_builder.geo_locator(geo_locator),
            transport: self.transport,
        }
    }

    pub fn build(self) -> Result<Traceroute<T, G>, TracerouteError> {
        let target_ip_address = self.traceroute_base_builder.validated_target()?;
        Ok(self.traceroute_base_builder.build(target_ip_address, self.transport))
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use async_trait::async_trait;

    use super::*;
    use crate::traceroute::probe::{Probe, ProbeError, ProbeOutcome};

    struct SilentTransport;

    #[async_trait]
    impl ProbeTransport for SilentTransport {
        async fn probe(&mut self, _probe: &Probe) -> Result<ProbeOutcome, ProbeError> {
            Ok(ProbeOutcome::Timeout)
        }
    }

    #[test]
    fn defaults_match_classic_traceroute() {
        let config = TraceConfig::default();

        assert_eq!(config.max_ttl, 30);
        assert_eq!(config.max_wait_probe, Duration::from_secs(2));
        assert_eq!(config.initial_sequence_number, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_hops_or_wait_are_rejected() {
        let zero_hops = TraceConfig { max_ttl: 0, ..TraceConfig::default() };
        let zero_wait = TraceConfig { max_wait_probe: Duration::ZERO, ..TraceConfig::default() };

        assert!(matches!(zero_hops.validate(), Err(TracerouteError::InvalidConfig(_))));
        assert!(matches!(zero_wait.validate(), Err(TracerouteError::InvalidConfig(_))));
    }

    #[test]
    fn target_is_required() {
        let result = TracerouteBuilder::with_transport(SilentTransport).max_ttl(5).build();
        assert!(matches!(result, Err(TracerouteError::InvalidConfig(_))));
    }

    #[test]
    fn settings_reach_the_engine() {
        let target = IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1));

        let traceroute = TracerouteBuilder::with_transport(SilentTransport)
            .target_ip_address(target)
            .max_ttl(7)
            .max_wait_probe(Duration::from_millis(250))
            .initial_sequence_number(100)
            .build()
            .unwrap();

        assert_eq!(traceroute.target(), target);
        assert_eq!(traceroute.config().max_ttl, 7);
        assert_eq!(traceroute.config().max_wait_probe, Duration::from_millis(250));
        assert_eq!(traceroute.config().initial_sequence_number, 100);
    }
}
