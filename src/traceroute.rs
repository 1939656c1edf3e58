use std::fmt::{Display, Formatter};
use std::net::IpAddr;

use async_stream::stream;
use futures::Stream;
use tracing::{debug, warn};

use crate::traceroute::builder::TraceConfig;
use crate::traceroute::error::TracerouteError;
use crate::traceroute::geolocation::{GeoLocation, GeoLocator};
use crate::traceroute::probe::{HopResult, ProbeOutcome, ProbeReply, ProbeTransport};
use crate::traceroute::probe::generator::ProbeGenerator;
use crate::traceroute::terminal::ReportSink;

pub mod async_socket;
pub mod builder;
pub mod error;
pub mod geolocation;
pub mod probe;
pub mod terminal;
pub mod utils;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminationReason {
    /// A reply came from the target address.
    Reached,
    /// The hop limit was used up without reaching the target.
    Exhausted,
    FatalError,
}

impl Display for TerminationReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationReason::Reached => write!(f, "destination reached"),
            TerminationReason::Exhausted => write!(f, "hop limit exhausted"),
            TerminationReason::FatalError => write!(f, "aborted"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceState {
    Probing(u8),
    RecordedReply(u8),
    RecordedTimeout(u8),
    Done(TerminationReason),
}

/// Drives one probe per expiry limit, from 1 up to the configured maximum.
///
/// Hops are produced strictly in order and one at a time; the trace stops at
/// the first reply coming from the target, once the hop limit is used up, or
/// when the probe transport becomes unusable.
pub struct Traceroute<T: ProbeTransport, G: GeoLocator> {
    target: IpAddr,
    config: TraceConfig,
    transport: T,
    geo_locator: G,
    probe_generator: ProbeGenerator,
    state: TraceState,
}

impl<T: ProbeTransport, G: GeoLocator> Traceroute<T, G> {
    pub fn new(target: IpAddr, config: TraceConfig, transport: T, geo_locator: G) -> Self {
        let state = if config.max_ttl == 0 {
            TraceState::Done(TerminationReason::Exhausted)
        } else {
            TraceState::Probing(1)
        };

        Self {
            target,
            probe_generator: ProbeGenerator::new(config.initial_sequence_number),
            config,
            transport,
            geo_locator,
            state,
        }
    }

    pub fn target(&self) -> IpAddr {
        self.target
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    pub fn state(&self) -> TraceState {
        self.state
    }

    pub fn termination_reason(&self) -> Option<TerminationReason> {
        match self.state {
            TraceState::Done(termination_reason) => Some(termination_reason),
            _ => None,
        }
    }

    /// Probes the next hop. Returns `None` once the trace is done.
    pub async fn next_hop(&mut self) -> Option<Result<HopResult, TracerouteError>> {
        let ttl = match self.state {
            TraceState::Probing(ttl) => ttl,
            TraceState::RecordedReply(_) | TraceState::RecordedTimeout(_) | TraceState::Done(_) => return None,
        };

        let probe = self.probe_generator.next_probe(ttl);
        debug!(ttl, sequence = probe.sequence(), "Sending probe");

        let hop_result = match self.transport.probe(&probe).await {
            Ok(ProbeOutcome::Reply(probe_reply)) => {
                self.state = TraceState::RecordedReply(ttl);
                self.record_reply(ttl, probe_reply).await
            },
            Ok(ProbeOutcome::Timeout) => {
                debug!(ttl, "Probe timed out");
                self.state = TraceState::RecordedTimeout(ttl);
                HopResult::timeout(ttl)
            },
            Err(probe_error) if probe_error.is_recoverable() => {
                debug!(ttl, error = %probe_error, "Probe failed, recording as timeout");
                self.state = TraceState::RecordedTimeout(ttl);
                HopResult::timeout(ttl)
            },
            Err(probe_error) => {
                warn!(ttl = probe_error.ttl(), error = %probe_error, "Probe transport unavailable, aborting trace");
                self.state = TraceState::Done(TerminationReason::FatalError);
                return Some(Err(TracerouteError::TransportConstruction {
                    target: self.target,
                    source: probe_error.into_io_error(),
                }));
            },
        };

        debug!(hop = %hop_result, "Recorded hop");
        self.state = self.next_state(&hop_result);
        Some(Ok(hop_result))
    }

    async fn record_reply(&self, ttl: u8, probe_reply: ProbeReply) -> HopResult {
        let from_address = probe_reply.from_address();
        debug!(
            ttl,
            address = %from_address,
            rtt_ms = probe_reply.rtt().as_secs_f64() * 1000.0,
            "Received probe reply"
        );

        let location = match self.geo_locator.locate(from_address).await {
            Ok(location) => location,
            Err(error) => {
                debug!(ttl, address = %from_address, %error, "Geolocation unavailable");
                GeoLocation::unknown()
            },
        };

        HopResult::reply(ttl, probe_reply, location)
    }

    fn next_state(&self, hop_result: &HopResult) -> TraceState {
        if hop_result.address() == Some(self.target) {
            debug!(ttl = hop_result.hop(), "Reached destination");
            return TraceState::Done(TerminationReason::Reached);
        }

        match hop_result.hop().checked_add(1) {
            Some(next_ttl) if next_ttl <= self.config.max_ttl => TraceState::Probing(next_ttl),
            _ => TraceState::Done(TerminationReason::Exhausted),
        }
    }

    /// Streams every hop to `sink` until the trace is done.
    pub async fn run<S: ReportSink + ?Sized>(&mut self, sink: &mut S) -> Result<TerminationReason, TracerouteError> {
        while let Some(hop_result) = self.next_hop().await {
            match hop_result {
                Ok(hop_result) => sink.report(hop_result),
                Err(error) => {
                    sink.finish(TerminationReason::FatalError);
                    return Err(error);
                },
            }
        }

        let termination_reason = self.termination_reason().unwrap_or(TerminationReason::Exhausted);
        sink.finish(termination_reason);
        Ok(termination_reason)
    }

    pub fn trace(mut self) -> impl Stream<Item = Result<HopResult, TracerouteError>> {
        stream! {
            while let Some(hop_result) = self.next_hop().await {
                yield hop_result;
            }
        }
    }
}
