//! Coarse geographic annotation of hop addresses.

use std::fmt::{Display, Formatter};
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::trace;

use crate::traceroute::error::GeolocationError;

pub const UNKNOWN: &str = "Unknown";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeoLocation {
    country: String,
    region: String,
    city: String,
}

impl GeoLocation {
    /// Empty fields are replaced by [`UNKNOWN`].
    pub fn new(country: &str, region: &str, city: &str) -> Self {
        Self {
            country: or_unknown(country),
            region: or_unknown(region),
            city: or_unknown(city),
        }
    }

    pub fn unknown() -> Self {
        Self::new(UNKNOWN, UNKNOWN, UNKNOWN)
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn city(&self) -> &str {
        &self.city
    }
}

impl Default for GeoLocation {
    fn default() -> Self {
        Self::unknown()
    }
}

impl Display for GeoLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}, {}", self.city, self.region, self.country)
    }
}

fn or_unknown(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        String::from(UNKNOWN)
    } else {
        value.to_string()
    }
}

#[async_trait]
pub trait GeoLocator: Send + Sync {
    async fn locate(&self, address: IpAddr) -> Result<GeoLocation, GeolocationError>;
}

#[async_trait]
impl<G: GeoLocator + ?Sized> GeoLocator for Box<G> {
    async fn locate(&self, address: IpAddr) -> Result<GeoLocation, GeolocationError> {
        (**self).locate(address).await
    }
}

/// Used when geolocation is switched off.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopGeoLocator;

#[async_trait]
impl GeoLocator for NoopGeoLocator {
    async fn locate(&self, _address: IpAddr) -> Result<GeoLocation, GeolocationError> {
        Ok(GeoLocation::unknown())
    }
}

/// Body returned by `ip-api.com/json/<address>`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IpApiResponse {
    status: Option<String>,
    message: Option<String>,
    country: String,
    #[serde(rename = "regionName")]
    region_name: String,
    city: String,
}

impl IpApiResponse {
    fn into_geo_location(self, address: IpAddr) -> Result<GeoLocation, GeolocationError> {
        if self.status.as_deref() == Some("fail") {
            return Err(GeolocationError::Lookup {
                address,
                message: self.message.unwrap_or_else(|| String::from("lookup failed")),
            });
        }

        Ok(GeoLocation::new(&self.country, &self.region_name, &self.city))
    }
}

/// Looks addresses up against the ip-api JSON endpoint.
pub struct IpApiGeoLocator {
    client: reqwest::Client,
    endpoint: String,
}

impl IpApiGeoLocator {
    pub const DEFAULT_ENDPOINT: &'static str = "http://ip-api.com/json/";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new() -> Result<Self, GeolocationError> {
        Self::with_endpoint(Self::DEFAULT_ENDPOINT, Self::DEFAULT_TIMEOUT)
    }

    /// `endpoint` is the URL prefix the address gets appended to.
    pub fn with_endpoint(endpoint: &str, timeout: Duration) -> Result<Self, GeolocationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;

        let mut endpoint = endpoint.to_string();
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GeoLocator for IpApiGeoLocator {
    async fn locate(&self, address: IpAddr) -> Result<GeoLocation, GeolocationError> {
        let url = format!("{}{address}", self.endpoint);
        trace!(%url, "Geolocation request");

        let ip_api_response: IpApiResponse = self.client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        ip_api_response.into_geo_location(address)
    }
}
