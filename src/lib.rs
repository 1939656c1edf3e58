pub use traceroute::builder::{TraceConfig, TracerouteBuilder};
pub use traceroute::error::{GeolocationError, ProbeError, TracerouteError};
pub use traceroute::geolocation::{GeoLocation, GeoLocator, IpApiGeoLocator, NoopGeoLocator};
pub use traceroute::probe::{HopResult, Probe, ProbeOutcome, ProbeReply, ProbeTransport};
pub use traceroute::probe::transport::IcmpProbeTransport;
pub use traceroute::terminal::{ReportSink, SinkFn, TracerouteTerminal};
pub use traceroute::utils::dns::{dns_lookup_first_ipv4_addr, resolve_target, system_lookup_first_ipv4_addr};
pub use traceroute::{TerminationReason, TraceState, Traceroute};

pub mod traceroute;
