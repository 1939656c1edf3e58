use crate::traceroute::probe::Probe;

/// Hands out one probe per hop with consecutive echo sequence numbers.
pub struct ProbeGenerator {
    icmp_sqn: u16,
}

impl ProbeGenerator {
    pub fn new(isn: u16) -> Self {
        Self {
            icmp_sqn: isn,
        }
    }

    pub fn next_probe(&mut self, ttl: u8) -> Probe {
        let probe = Probe::new(ttl, self.icmp_sqn);
        self.icmp_sqn = self.icmp_sqn.wrapping_add(1);
        probe
    }
}
