use std::time::Duration;

use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;

use waypost_core::{Fix, Geocoder, Placemark, prelude::*};

const fn nominatim_host() -> &'static str {
    if let Some(host) = option_env!("NOMINATIM_HOST") {
        host
    } else {
        "nominatim.openstreetmap.org"
    }
}

const fn nominatim_secure() -> bool {
    if let Some(secure) = option_env!("NOMINATIM_SECURE") {
        const_str::eq_ignore_ascii_case!(secure, "true") || const_str::equal!(secure, "1")
    } else {
        true
    }
}

const fn nominatim_proto() -> &'static str {
    if nominatim_secure() { "https" } else { "http" }
}

const NOMINATIM_HOST: &str = nominatim_host();
const NOMINATIM_PROTO: &str = nominatim_proto();
const NOMINATIM_URL: &str = const_str::concat!(NOMINATIM_PROTO, "://", NOMINATIM_HOST);

const USER_AGENT: &str = concat!("waypost/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Reverse-geocoding gateway backed by the Nominatim HTTP API.
///
/// Nominatim's usage policy wants a descriptive User-Agent and no more than
/// one request per second; one lookup per accepted fix stays well inside that
/// even at the finest update interval. Point `NOMINATIM_HOST` at a self-hosted
/// instance at build time to lift the limit.
pub struct NominatimGeocoder {
    client: Client,
}

impl NominatimGeocoder {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Could not build geocoding client")?;
        Ok(Self { client })
    }

    async fn lookup(&self, fix: Fix) -> Result<Option<Placemark>> {
        let url = format!(
            "{NOMINATIM_URL}/reverse?format=jsonv2&lat={}&lon={}&zoom=18&addressdetails=1",
            fix.lat, fix.long
        );
        let body = self
            .client
            .get(url)
            .send()
            .await
            .context("Could not send reverse geocoding request")?
            .error_for_status()
            .context("Geocoding server returned an error")?
            .text()
            .await
            .context("Could not read geocoding response")?;
        let response: ReverseResponse =
            serde_json::from_str(&body).context("Could not decode geocoding response")?;
        Ok(response_to_placemark(response))
    }
}

impl Geocoder for NominatimGeocoder {
    async fn reverse(&self, fix: Fix) -> Option<Placemark> {
        match self.lookup(fix).await {
            Ok(Some(placemark)) => Some(placemark),
            Ok(None) => {
                // Open water and the poles geocode to nothing, that's not an error
                debug!("No address known for ({}, {})", fix.lat, fix.long);
                None
            }
            Err(why) => {
                warn!("Reverse geocoding failed: {why:?}");
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    error: Option<String>,
    #[serde(default)]
    address: ReverseAddress,
}

/// The subset of Nominatim's `addressdetails` keys the facade exposes
#[derive(Debug, Default, Deserialize)]
struct ReverseAddress {
    house_number: Option<String>,
    road: Option<String>,
    neighbourhood: Option<String>,
    suburb: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    county: Option<String>,
    state: Option<String>,
    postcode: Option<String>,
    country: Option<String>,
    country_code: Option<String>,
}

fn response_to_placemark(response: ReverseResponse) -> Option<Placemark> {
    if response.error.is_some() {
        return None;
    }
    let addr = response.address;
    Some(Placemark {
        // Nominatim files the locality under different keys depending on its size
        city: addr.city.or(addr.town).or(addr.village),
        neighbourhood: addr.neighbourhood.or(addr.suburb),
        state: addr.state,
        county: addr.county,
        country: addr.country,
        iso_country_code: addr.country_code.map(|code| code.to_uppercase()),
        post_code: addr.postcode,
        street: addr.road,
        house_number: addr.house_number,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> ReverseResponse {
        serde_json::from_str(body).expect("Failed to parse test payload")
    }

    #[test]
    fn maps_a_full_address() {
        let body = r#"{
            "place_id": 240109189,
            "display_name": "10, Downing Street, Westminster, London, Greater London, England, SW1A 2AA, United Kingdom",
            "address": {
                "house_number": "10",
                "road": "Downing Street",
                "neighbourhood": "St. James's",
                "city": "London",
                "county": "Greater London",
                "state": "England",
                "postcode": "SW1A 2AA",
                "country": "United Kingdom",
                "country_code": "gb"
            }
        }"#;

        let placemark = response_to_placemark(parse(body)).expect("Expected a placemark");
        assert_eq!(placemark.house_number.as_deref(), Some("10"));
        assert_eq!(placemark.street.as_deref(), Some("Downing Street"));
        assert_eq!(placemark.neighbourhood.as_deref(), Some("St. James's"));
        assert_eq!(placemark.city.as_deref(), Some("London"));
        assert_eq!(placemark.county.as_deref(), Some("Greater London"));
        assert_eq!(placemark.state.as_deref(), Some("England"));
        assert_eq!(placemark.post_code.as_deref(), Some("SW1A 2AA"));
        assert_eq!(placemark.country.as_deref(), Some("United Kingdom"));
        assert_eq!(placemark.iso_country_code.as_deref(), Some("GB"));
    }

    #[test]
    fn falls_back_to_town_and_suburb() {
        let body = r#"{
            "address": {
                "town": "Uppsala",
                "suburb": "Luthagen",
                "country": "Sverige",
                "country_code": "se"
            }
        }"#;

        let placemark = response_to_placemark(parse(body)).expect("Expected a placemark");
        assert_eq!(placemark.city.as_deref(), Some("Uppsala"));
        assert_eq!(placemark.neighbourhood.as_deref(), Some("Luthagen"));
        assert_eq!(placemark.iso_country_code.as_deref(), Some("SE"));
        assert_eq!(placemark.street, None);
        assert_eq!(placemark.house_number, None);
    }

    #[test]
    fn city_takes_precedence_over_town() {
        let body = r#"{
            "address": {
                "city": "Stockholm",
                "town": "Should not be used"
            }
        }"#;

        let placemark = response_to_placemark(parse(body)).expect("Expected a placemark");
        assert_eq!(placemark.city.as_deref(), Some("Stockholm"));
    }

    #[test]
    fn error_payload_yields_none() {
        let body = r#"{"error": "Unable to geocode"}"#;
        assert_eq!(response_to_placemark(parse(body)), None);
    }

    #[test]
    fn missing_address_stays_absent() {
        let body = r#"{"place_id": 1}"#;
        let placemark = response_to_placemark(parse(body)).expect("Expected a placemark");
        assert!(placemark.is_empty());
    }
}
