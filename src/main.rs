use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use geo_traceroute::{
    GeoLocator, IpApiGeoLocator, NoopGeoLocator, resolve_target, TraceConfig, TracerouteBuilder,
    TracerouteError, TracerouteTerminal,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(name = "geo-traceroute")]
#[command(bin_name = "geo-traceroute")]
struct TracerouteOptions {
    /// Target host name or IP address
    #[arg(required = true, index = 1)]
    host: String,

    /// Set the max number of hops (max TTL to be reached)
    #[arg(short, long, default_value_t = TraceConfig::DEFAULT_MAX_TTL, value_parser=clap::value_parser!(u8).range(1..=255))]
    max_hops: u8,

    /// Wait for a probe no more than <WAIT>
    #[arg(short, long, value_parser = humantime::parse_duration, default_value = "2s")]
    wait: Duration,

    /// Do not look up the location of replying hops
    #[arg(long)]
    no_geo: bool,

    /// URL prefix of an ip-api compatible geolocation service [default: http://ip-api.com/json/]
    #[arg(long)]
    geo_endpoint: Option<String>,

    /// Log probe activity to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_geo_locator(traceroute_options: &TracerouteOptions) -> Box<dyn GeoLocator> {
    if traceroute_options.no_geo {
        return Box::new(NoopGeoLocator);
    }

    let ip_api_geo_locator = match &traceroute_options.geo_endpoint {
        Some(geo_endpoint) => IpApiGeoLocator::with_endpoint(geo_endpoint, IpApiGeoLocator::DEFAULT_TIMEOUT),
        None => IpApiGeoLocator::new(),
    };

    match ip_api_geo_locator {
        Ok(geo_locator) => Box::new(geo_locator),
        Err(error) => {
            warn!(%error, "Geolocation disabled");
            Box::new(NoopGeoLocator)
        },
    }
}

async fn run(traceroute_options: TracerouteOptions) -> Result<(), TracerouteError> {
    let hostname = &traceroute_options.host;
    let ip_addr = resolve_target(hostname).await?;
    debug!(%hostname, %ip_addr, "Resolved target");

    let geo_locator = build_geo_locator(&traceroute_options);
    let mut traceroute = TracerouteBuilder::icmp()
        .target_ip_address(ip_addr)
        .max_ttl(traceroute_options.max_hops)
        .max_wait_probe(traceroute_options.wait)
        .geo_locator(geo_locator)
        .build()?;

    println!("traceroute to {ip_addr} ({hostname}), {} hops max", traceroute_options.max_hops);
    let mut traceroute_terminal = TracerouteTerminal::stdout();
    let termination_reason = traceroute.run(&mut traceroute_terminal).await?;
    debug!(%termination_reason, "Trace finished");

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let traceroute_options = TracerouteOptions::parse();
    init_logging(traceroute_options.verbose);

    match run(traceroute_options).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        },
    }
}
