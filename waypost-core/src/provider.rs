use crate::location::{Fix, Placemark};
use crate::prelude::*;

/// Seam over the platform location service. Implementations wrap whatever the
/// operating system provides; the hub never talks to the platform directly.
///
/// Implementations must start with automatic updates disabled. The hub only
/// pushes a filter once some requester asks for one.
pub trait LocationProvider: Send + Sync {
    /// Whether the user has location services enabled for this process
    fn services_enabled(&self) -> bool;

    /// Perform an immediate one-shot fetch. None means a fix could not be
    /// obtained; implementations are expected to log the reason themselves.
    fn request_fix(&self) -> impl Future<Output = Option<Fix>> + Send;

    /// Wait for the next fix pushed by the platform because the device moved
    /// past the current distance filter. Returning None means the provider has
    /// shut down and no further fixes will arrive.
    fn next_fix(&self) -> impl Future<Output = Option<Fix>> + Send;

    /// Apply a new distance filter, in meters moved between automatic updates.
    /// None disables automatic updates entirely.
    fn set_distance_filter(&self, meters: Option<f64>) -> impl Future<Output = Result> + Send;
}

/// Seam over the reverse-geocoding companion of the location service
pub trait Geocoder: Send + Sync {
    /// Resolve address components for a fix. None means the lookup failed or
    /// the service knows nothing about the position.
    fn reverse(&self, fix: Fix) -> impl Future<Output = Option<Placemark>> + Send;
}

/// Geocoder for consumers that only care about raw fixes
pub struct NullGeocoder;

impl Geocoder for NullGeocoder {
    async fn reverse(&self, _fix: Fix) -> Option<Placemark> {
        None
    }
}
