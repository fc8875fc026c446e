use thiserror::Error;
use waymark_directions::{Coordinate, RouteResult};

#[derive(Debug, Error, PartialEq)]
pub enum SelectionError {
    #[error("current location can only be used as start while nothing is selected")]
    NotIdle,
}

/// Which taps mean what. At most two points are tracked at any time.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RouteSelection {
    #[default]
    Idle,
    StartChosen {
        start: Coordinate,
    },
    RouteReady {
        start: Coordinate,
        end: Coordinate,
        /// Unset until a fetch for exactly this pair succeeds.
        result: Option<RouteResult>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TapOutcome {
    /// The tap became the (new) start; any previous route is gone.
    StartChosen,
    /// Both points are chosen and a route should be fetched.
    RouteRequested { start: Coordinate, end: Coordinate },
}

impl RouteSelection {
    pub fn tap(&mut self, point: Coordinate) -> TapOutcome {
        match *self {
            RouteSelection::StartChosen { start } => {
                *self = RouteSelection::RouteReady {
                    start,
                    end: point,
                    result: None,
                };
                TapOutcome::RouteRequested { start, end: point }
            }
            RouteSelection::Idle | RouteSelection::RouteReady { .. } => {
                *self = RouteSelection::StartChosen { start: point };
                TapOutcome::StartChosen
            }
        }
    }

    pub fn clear(&mut self) {
        *self = RouteSelection::Idle;
    }

    pub fn use_current_location(&mut self, location: Coordinate) -> Result<(), SelectionError> {
        match self {
            RouteSelection::Idle => {
                *self = RouteSelection::StartChosen { start: location };
                Ok(())
            }
            _ => Err(SelectionError::NotIdle),
        }
    }

    /// Stores `route` if the selection still holds exactly `start -> end`.
    pub fn set_result(&mut self, start: Coordinate, end: Coordinate, route: RouteResult) -> bool {
        match self {
            RouteSelection::RouteReady {
                start: current_start,
                end: current_end,
                result,
            } if *current_start == start && *current_end == end => {
                *result = Some(route);
                true
            }
            _ => false,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, RouteSelection::Idle)
    }

    pub fn start(&self) -> Option<Coordinate> {
        match self {
            RouteSelection::Idle => None,
            RouteSelection::StartChosen { start } | RouteSelection::RouteReady { start, .. } => {
                Some(*start)
            }
        }
    }

    pub fn end(&self) -> Option<Coordinate> {
        match self {
            RouteSelection::RouteReady { end, .. } => Some(*end),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&RouteResult> {
        match self {
            RouteSelection::RouteReady { result, .. } => result.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    fn route() -> RouteResult {
        RouteResult {
            polyline: vec![point(12.90, 77.59), point(12.97, 77.59)],
            distance_meters: 12345.0,
            duration_seconds: 1800.0,
        }
    }

    #[test]
    fn test_tap_cycle() {
        let (a, b, c) = (point(1.0, 1.0), point(2.0, 2.0), point(3.0, 3.0));
        let mut selection = RouteSelection::default();

        assert_eq!(selection.tap(a), TapOutcome::StartChosen);
        assert_eq!(selection, RouteSelection::StartChosen { start: a });

        assert_eq!(
            selection.tap(b),
            TapOutcome::RouteRequested { start: a, end: b }
        );
        assert_eq!(
            selection,
            RouteSelection::RouteReady {
                start: a,
                end: b,
                result: None
            }
        );

        assert!(selection.set_result(a, b, route()));
        assert!(selection.result().is_some());

        assert_eq!(selection.tap(c), TapOutcome::StartChosen);
        assert_eq!(selection, RouteSelection::StartChosen { start: c });
        assert!(selection.result().is_none());
    }

    #[test]
    fn test_clear_from_any_state() {
        let (a, b) = (point(1.0, 1.0), point(2.0, 2.0));

        let mut selection = RouteSelection::default();
        selection.clear();
        assert!(selection.is_idle());

        selection.tap(a);
        selection.clear();
        assert!(selection.is_idle());

        selection.tap(a);
        selection.tap(b);
        selection.set_result(a, b, route());
        selection.clear();
        assert!(selection.is_idle());
        assert!(selection.result().is_none());
    }

    #[test]
    fn test_use_current_location_only_when_idle() {
        let (a, here) = (point(1.0, 1.0), point(5.0, 5.0));
        let mut selection = RouteSelection::default();

        assert_eq!(selection.use_current_location(here), Ok(()));
        assert_eq!(selection.start(), Some(here));

        assert_eq!(
            selection.use_current_location(a),
            Err(SelectionError::NotIdle)
        );
        assert_eq!(selection.start(), Some(here));
    }

    #[test]
    fn test_set_result_requires_matching_pair() {
        let (a, b, c) = (point(1.0, 1.0), point(2.0, 2.0), point(3.0, 3.0));
        let mut selection = RouteSelection::default();

        assert!(!selection.set_result(a, b, route()));

        selection.tap(a);
        selection.tap(b);
        assert!(!selection.set_result(a, c, route()));
        assert!(selection.result().is_none());

        assert!(selection.set_result(a, b, route()));
        assert_eq!(selection.end(), Some(b));
    }
}
