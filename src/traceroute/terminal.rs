use std::io;
use std::io::Write;

use tracing::warn;

use crate::traceroute::probe::HopResult;
use crate::traceroute::TerminationReason;

/// Receives hops in increasing order, one at a time, as they are produced.
pub trait ReportSink {
    fn report(&mut self, hop_result: HopResult);

    fn finish(&mut self, _termination_reason: TerminationReason) {}
}

impl ReportSink for Vec<HopResult> {
    fn report(&mut self, hop_result: HopResult) {
        self.push(hop_result);
    }
}

/// Adapts a per-hop callback into a [`ReportSink`].
pub struct SinkFn<F: FnMut(HopResult)>(pub F);

impl<F: FnMut(HopResult)> ReportSink for SinkFn<F> {
    fn report(&mut self, hop_result: HopResult) {
        (self.0)(hop_result);
    }
}

const TABLE_BORDER: &str = "+-----+-----------------+-----------+---------------+------------+------------+";
const TABLE_HEADER: &str = "| Hop | IP Address      | Delay     | Country       | Region     | City       |";

/// Renders hops as a fixed-width table.
pub struct TracerouteTerminal<W: Write> {
    writer: W,
    header_printed: bool,
}

impl TracerouteTerminal<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TracerouteTerminal<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            header_printed: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn format_hop(hop_result: &HopResult) -> String {
        let location = hop_result.location();
        let (address, delay) = match (hop_result.address(), hop_result.rtt()) {
            (Some(address), Some(rtt)) => {
                let rtt_ms = rtt.as_secs_f64() * 1000f64;
                (address.to_string(), format!("{rtt_ms:.2} ms"))
            },
            _ => (String::from("Timeout"), String::from("*")),
        };

        format!(
            "| {:>3} | {:<15} | {:>9} | {:<13} | {:<10} | {:<10} |",
            hop_result.hop(),
            address,
            delay,
            location.country(),
            location.region(),
            location.city(),
        )
    }

    fn print_header(&mut self) -> io::Result<()> {
        if self.header_printed {
            return Ok(());
        }

        writeln!(self.writer, "{TABLE_BORDER}")?;
        writeln!(self.writer, "{TABLE_HEADER}")?;
        writeln!(self.writer, "{TABLE_BORDER}")?;
        self.header_printed = true;
        Ok(())
    }

    fn print_hop(&mut self, hop_result: &HopResult) -> io::Result<()> {
        self.print_header()?;
        writeln!(self.writer, "{}", Self::format_hop(hop_result))?;
        self.writer.flush()
    }

    fn print_footer(&mut self) -> io::Result<()> {
        self.print_header()?;
        writeln!(self.writer, "{TABLE_BORDER}")?;
        self.writer.flush()
    }
}

impl<W: Write> ReportSink for TracerouteTerminal<W> {
    fn report(&mut self, hop_result: HopResult) {
        if let Err(error) = self.print_hop(&hop_result) {
            warn!(hop = hop_result.hop(), %error, "Unable to print hop");
        }
    }

    fn finish(&mut self, _termination_reason: TerminationReason) {
        if let Err(error) = self.print_footer() {
            warn!(%error, "Unable to print table footer");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    use super::*;
    use crate::traceroute::geolocation::GeoLocation;
    use crate::traceroute::probe::ProbeReply;

    fn reply_hop() -> HopResult {
        let probe_reply = ProbeReply::new(IpAddr::V4(Ipv4Addr::new(62, 115, 42, 118)), Duration::from_micros(12_346));
        HopResult::reply(3, probe_reply, GeoLocation::new("Sweden", "Stockholm", "Stockholm"))
    }

    #[test]
    fn reply_row_is_fixed_width() {
        let row = TracerouteTerminal::<Vec<u8>>::format_hop(&reply_hop());

        assert_eq!(row, "|   3 | 62.115.42.118   |  12.35 ms | Sweden        | Stockholm  | Stockholm  |");
        assert_eq!(row.len(), TABLE_BORDER.len());
    }

    #[test]
    fn timeout_row_uses_placeholders() {
        let row = TracerouteTerminal::<Vec<u8>>::format_hop(&HopResult::timeout(12));

        assert_eq!(row, "|  12 | Timeout         |         * | Unknown       | Unknown    | Unknown    |");
    }

    #[test]
    fn table_is_framed_by_header_and_footer() {
        let mut terminal = TracerouteTerminal::new(Vec::new());
        terminal.report(reply_hop());
        terminal.report(HopResult::timeout(4));
        terminal.finish(TerminationReason::Exhausted);

        let output = String::from_utf8(terminal.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], TABLE_BORDER);
        assert_eq!(lines[1], TABLE_HEADER);
        assert!(lines[3].starts_with("|   3 |"));
        assert!(lines[4].starts_with("|   4 | Timeout"));
        assert_eq!(lines[5], TABLE_BORDER);
    }

    #[test]
    fn closure_sink_sees_every_hop() {
        let mut hops = Vec::new();
        {
            let mut sink = SinkFn(|hop_result: HopResult| hops.push(hop_result.hop()));
            sink.report(HopResult::timeout(1));
            sink.report(HopResult::timeout(2));
        }

        assert_eq!(hops, vec![1, 2]);
    }
}
