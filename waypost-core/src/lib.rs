mod hub;
mod interval;
mod location;
mod provider;
mod registry;
#[cfg(test)]
mod tests;

pub use hub::LocationHub;
pub use interval::UpdateInterval;
pub use location::{Fix, LocationSnapshot, Placemark, UtcDT};
pub use provider::{Geocoder, LocationProvider, NullGeocoder};
pub use registry::{IntervalGuard, ListenerGuard, UpdateListener};

pub mod prelude {
    use anyhow::Error as AnyhowError;
    use std::result::Result as StdResult;
    pub type Result<T = (), E = AnyhowError> = StdResult<T, E>;
    pub use anyhow::Context;
}
