pub mod coordinate;
pub mod error;
pub mod ors_api;
pub mod polyline;
pub mod route_result;
pub mod transport;

pub use coordinate::{Coordinate, CoordinateError};
pub use error::{DirectionsError, FetchErrorKind};
pub use ors_api::{
    DirectionsProfile, DirectionsRequestBody, OrsDirectionsClient, OrsDirectionsClientParams,
    RoutePreference,
};
pub use route_result::RouteResult;
pub use transport::{DirectionsTransport, ReqwestTransport, TransportResponse};
