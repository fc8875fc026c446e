use geo::BoundingRect;
use serde::{Deserialize, Serialize};

use crate::coordinate::Coordinate;

/// The route artifact computed for one start/end pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    pub polyline: Vec<Coordinate>,

    /// Distance in meters
    pub distance_meters: f64,

    /// Duration in seconds
    pub duration_seconds: f64,
}

impl RouteResult {
    /// Kilometres with two decimals, e.g. `12345 m` -> `"12.35 km"`.
    pub fn distance_label(&self) -> String {
        // Rounding on decameters keeps half-way values like 12.345 km from
        // falling to the binary representation below them.
        let km = (self.distance_meters / 10.0).round() / 100.0;
        format!("{:.2} km", km)
    }

    /// Whole minutes, with hours split out once the route reaches an hour.
    pub fn duration_label(&self) -> String {
        let minutes = (self.duration_seconds / 60.0).round().max(0.0) as u64;

        if minutes < 60 {
            format!("{} min", minutes)
        } else {
            format!("{} h {:02} min", minutes / 60, minutes % 60)
        }
    }

    pub fn bounding_box(&self) -> Option<geo_types::Rect<f64>> {
        let line: geo_types::LineString<f64> =
            self.polyline.iter().map(geo_types::Coord::<f64>::from).collect();
        line.bounding_rect()
    }
}
