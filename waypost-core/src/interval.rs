use serde::{Deserialize, Serialize};

/// How far the device must travel before the location service pushes a fresh
/// fix.
///
/// Variants are declared most precise first so that the derived ordering is
/// the precision ordering: the minimum over a set of requests is the one that
/// wins arbitration. [UpdateInterval::Manual] sorts last and means no
/// automatic updates at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UpdateInterval {
    /// Update roughly every 10 meters moved, enough for turn-by-turn navigation
    TurnByTurn,
    /// Update every 100 meters
    HundredMeters,
    /// Update every kilometer
    Kilometer,
    /// Only update when explicitly requested
    Manual,
}

impl UpdateInterval {
    /// The distance filter to hand to the platform. None disables automatic
    /// updates entirely.
    pub fn distance_meters(self) -> Option<f64> {
        match self {
            UpdateInterval::TurnByTurn => Some(10.0),
            UpdateInterval::HundredMeters => Some(100.0),
            UpdateInterval::Kilometer => Some(1000.0),
            UpdateInterval::Manual => None,
        }
    }

    pub fn is_automatic(self) -> bool {
        self != UpdateInterval::Manual
    }
}

impl Default for UpdateInterval {
    fn default() -> Self {
        Self::Manual
    }
}
