pub mod admission;
pub mod config;
pub mod location;
pub mod map_view;
pub mod route_selection;
pub mod session;

pub use admission::{AdmissionConfig, AdmissionController, Decision, QuotaState, RequestToken};
pub use config::{ConfigError, DirectionsOptions, SessionConfig};
pub use location::{LocationFilter, LocationFix, LocationTracker};
pub use map_view::{CameraRegion, EdgePadding, MapScene, MapView, Marker, MarkerRole, TracingMapView};
pub use route_selection::{RouteSelection, SelectionError, TapOutcome};
pub use session::{CompletionOutcome, EventOutcome, FetchCompletion, RouteSession, SessionEvent};
