use std::net::IpAddr;
use std::time::Duration;

use futures::{pin_mut, StreamExt};
use ntest::timeout;

use geo_traceroute::{dns_lookup_first_ipv4_addr, TracerouteBuilder};

async fn get_google_ip() -> IpAddr {
    match dns_lookup_first_ipv4_addr("google.com").await {
        None => panic!("Hostname not resolvable"),
        Some(ip_addr) => ip_addr,
    }
}

const MAX_HOPS: u8 = 3;

// Needs network access and CAP_NET_RAW: cargo test -- --ignored
#[tokio::test]
#[ignore]
#[timeout(4000)]
async fn timeout_icmp() {
    let ip_addr = get_google_ip().await;
    let max_wait_probe: Duration = Duration::from_millis(1000);

    let traceroute = TracerouteBuilder::icmp()
        .target_ip_address(ip_addr)
        .max_ttl(MAX_HOPS)
        .max_wait_probe(max_wait_probe)
        .build();

    let traceroute_stream = match traceroute {
        Ok(traceroute) => traceroute.trace(),
        Err(error) => panic!("Unable to start traceroute: {}", error),
    };

    pin_mut!(traceroute_stream);
    let mut hops = 0;
    while let Some(hop_result) = traceroute_stream.next().await {
        assert!(hop_result.is_ok());
        hops += 1;
    }

    assert!(hops <= MAX_HOPS);
}
