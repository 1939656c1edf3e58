use std::net::IpAddr;
use std::str::FromStr;

use domain::base::name::Name;
use domain::resolv::StubResolver;
use tracing::debug;

use crate::traceroute::error::TracerouteError;

pub async fn dns_lookup_first_ipv4_addr(hostname: &str) -> Option<IpAddr> {
    let qname = match Name::<Vec<u8>>::from_str(hostname) {
        Ok(qname) => qname,
        Err(error) => {
            debug!(hostname, %error, "Invalid host name");
            return None;
        }
    };

    let resolver = StubResolver::new();
    let found_hosts = match resolver.lookup_host(qname).await {
        Ok(found_hosts) => found_hosts,
        Err(error) => {
            debug!(hostname, %error, "Host lookup failed");
            return None;
        }
    };

    found_hosts
        .iter()
        .find(|ip_addr| ip_addr.is_ipv4())
}

/// Asks the system resolver, which also consults the hosts file and the
/// configured search domains.
pub async fn system_lookup_first_ipv4_addr(hostname: &str) -> Option<IpAddr> {
    let socket_addrs = match tokio::net::lookup_host((hostname, 0)).await {
        Ok(socket_addrs) => socket_addrs,
        Err(error) => {
            debug!(hostname, %error, "System host lookup failed");
            return None;
        }
    };

    socket_addrs
        .map(|socket_addr| socket_addr.ip())
        .find(IpAddr::is_ipv4)
}

/// Resolves the user supplied target: literal addresses first, then a DNS
/// query, then the system resolver.
pub async fn resolve_target(host: &str) -> Result<IpAddr, TracerouteError> {
    if let Ok(ip_addr) = IpAddr::from_str(host) {
        return Ok(ip_addr);
    }

    let resolution_error = || TracerouteError::Resolution { host: host.to_string() };
    if Name::<Vec<u8>>::from_str(host).is_err() {
        return Err(resolution_error());
    }

    if let Some(ip_addr) = dns_lookup_first_ipv4_addr(host).await {
        return Ok(ip_addr);
    }

    system_lookup_first_ipv4_addr(host)
        .await
        .ok_or_else(resolution_error)
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    #[tokio::test]
    async fn literal_address_skips_lookup() {
        let ip_addr = resolve_target("8.8.4.4").await.unwrap();
        assert_eq!(ip_addr, IpAddr::V4(Ipv4Addr::new(8, 8, 4, 4)));
    }

    #[tokio::test]
    async fn malformed_name_is_a_resolution_error() {
        let error = resolve_target("bad..name").await.unwrap_err();
        assert!(matches!(error, TracerouteError::Resolution { ref host } if host == "bad..name"));
    }

    #[tokio::test]
    async fn hosts_file_names_resolve() {
        let ip_addr = resolve_target("localhost").await.unwrap();
        assert!(ip_addr.is_loopback());
    }

    #[tokio::test]
    async fn system_lookup_skips_ipv6_results() {
        let ip_addr = system_lookup_first_ipv4_addr("localhost").await;
        assert_eq!(ip_addr, Some(IpAddr::V4(Ipv4Addr::LOCALHOST)));
    }
}
