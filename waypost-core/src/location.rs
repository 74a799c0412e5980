use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Convenience alias for UTC DT
pub type UtcDT = DateTime<Utc>;

/// A single resolved reading from the location service
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub long: f64,
}

/// Address components derived from a fix by reverse geocoding. Any field may be
/// absent; the street-level fields in particular are only meaningful at finer
/// update intervals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placemark {
    pub city: Option<String>,
    /// District within the city, not known everywhere
    pub neighbourhood: Option<String>,
    /// Administrative state/province. Not to be confused with county
    pub state: Option<String>,
    pub county: Option<String>,
    pub country: Option<String>,
    pub iso_country_code: Option<String>,
    pub post_code: Option<String>,
    pub street: Option<String>,
    pub house_number: Option<String>,
}

impl Placemark {
    pub fn is_empty(&self) -> bool {
        self.city.is_none()
            && self.neighbourhood.is_none()
            && self.state.is_none()
            && self.county.is_none()
            && self.country.is_none()
            && self.iso_country_code.is_none()
            && self.post_code.is_none()
            && self.street.is_none()
            && self.house_number.is_none()
    }
}

/// The latest fix together with its geocode. Replaced wholesale on every
/// update, never merged field by field with the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSnapshot {
    pub fix: Fix,
    /// When the fix was recorded
    pub recorded_at: UtcDT,
    /// Empty when reverse geocoding failed or was skipped
    pub placemark: Placemark,
}
