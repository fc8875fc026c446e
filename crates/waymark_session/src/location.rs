use serde::{Deserialize, Serialize};
use tracing::debug;
use waymark_directions::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub coordinate: Coordinate,
    pub accuracy_meters: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LocationFilter {
    /// Fixes less accurate than this are dropped. `None` keeps every fix.
    pub max_accuracy_meters: Option<f64>,
}

impl LocationFilter {
    pub fn accepts(&self, fix: &LocationFix) -> bool {
        match self.max_accuracy_meters {
            Some(max) => fix.accuracy_meters.is_finite() && fix.accuracy_meters <= max,
            None => true,
        }
    }
}

#[derive(Debug, Default)]
pub struct LocationTracker {
    filter: LocationFilter,
    current: Option<LocationFix>,
}

impl LocationTracker {
    pub fn new(filter: LocationFilter) -> Self {
        Self {
            filter,
            current: None,
        }
    }

    /// Returns true if the fix was kept.
    pub fn update(&mut self, fix: LocationFix) -> bool {
        if !self.filter.accepts(&fix) {
            debug!(
                "Location: dropping fix with accuracy {} m",
                fix.accuracy_meters
            );
            return false;
        }

        self.current = Some(fix);
        true
    }

    pub fn current(&self) -> Option<&LocationFix> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix(accuracy_meters: f64) -> LocationFix {
        LocationFix {
            coordinate: Coordinate::new(12.9, 77.6).unwrap(),
            accuracy_meters,
        }
    }

    #[test]
    fn test_filter_threshold() {
        let filter = LocationFilter {
            max_accuracy_meters: Some(30.0),
        };

        assert!(filter.accepts(&fix(5.0)));
        assert!(filter.accepts(&fix(30.0)));
        assert!(!filter.accepts(&fix(30.5)));
        assert!(!filter.accepts(&fix(f64::NAN)));

        assert!(LocationFilter::default().accepts(&fix(500.0)));
    }

    #[test]
    fn test_tracker_keeps_last_accepted_fix() {
        let mut tracker = LocationTracker::new(LocationFilter {
            max_accuracy_meters: Some(30.0),
        });
        assert!(tracker.current().is_none());

        assert!(tracker.update(fix(10.0)));
        assert!(!tracker.update(fix(80.0)));
        assert_eq!(tracker.current().map(|f| f.accuracy_meters), Some(10.0));
    }
}
