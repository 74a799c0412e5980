mod nominatim;

pub use nominatim::NominatimGeocoder;
