//! Distance gate deciding when a new sample is worth a reverse geocode.

use scout_core::Position;

/// Outcome of feeding one sample through a [`GeocodeGate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateDecision {
    /// Distance from the previous marker in meters, `None` for the first sample.
    pub distance_m: Option<f64>,
    pub should_geocode: bool,
}

/// Tracks the previous position marker and applies the geocode threshold.
///
/// The marker moves to every observed sample, whether or not it triggered a
/// lookup, so distances are always measured from the immediately preceding
/// sample.
#[derive(Debug, Clone)]
pub struct GeocodeGate {
    threshold_m: f64,
    marker: Option<Position>,
}

impl GeocodeGate {
    pub fn new(threshold_m: f64) -> Self {
        Self { threshold_m, marker: None }
    }

    /// Compare `sample` against the marker, then move the marker to `sample`.
    pub fn observe(&mut self, sample: Position) -> GateDecision {
        let distance_m = self.marker.map(|prev| prev.distance_to(&sample));
        self.marker = Some(sample);
        GateDecision {
            distance_m,
            should_geocode: distance_m.is_some_and(|d| d > self.threshold_m),
        }
    }

    pub fn marker(&self) -> Option<Position> {
        self.marker
    }

    pub fn threshold_m(&self) -> f64 {
        self.threshold_m
    }
}
