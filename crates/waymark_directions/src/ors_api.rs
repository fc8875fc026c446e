use std::fmt::Display;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    coordinate::{Coordinate, LonLat},
    error::{DirectionsError, OrsErrorPayload},
    polyline::densify,
    route_result::RouteResult,
    transport::DirectionsTransport,
};

pub const ORS_API_URL: &str = "https://api.openrouteservice.org";

#[derive(Debug, Deserialize, Serialize, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DirectionsProfile {
    #[default]
    DrivingCar,
}

impl Display for DirectionsProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                DirectionsProfile::DrivingCar => "driving-car",
            }
        )
    }
}

#[derive(Debug, Deserialize, Serialize, Copy, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RoutePreference {
    Fastest,
    Shortest,
    Recommended,
}

impl std::str::FromStr for RoutePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fastest" => Ok(RoutePreference::Fastest),
            "shortest" => Ok(RoutePreference::Shortest),
            "recommended" => Ok(RoutePreference::Recommended),
            other => Err(format!(
                "Unknown preference \"{}\" (fastest, shortest, recommended)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DirectionsRequestBody {
    /// `[[lon, lat], [lon, lat]]`
    pub coordinates: Vec<LonLat>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub preference: Option<RoutePreference>,

    /// Ask the API for a simplified geometry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry_simplify: Option<bool>,

    /// Extra per-segment annotations, e.g. "waytype", "surface"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_info: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct DirectionsResponse {
    features: Vec<RouteFeature>,
}

#[derive(Deserialize)]
struct RouteFeature {
    geometry: Option<RouteGeometry>,
    properties: Option<RouteProperties>,
}

#[derive(Deserialize)]
struct RouteGeometry {
    coordinates: Vec<LonLat>,
}

#[derive(Deserialize)]
struct RouteProperties {
    summary: Option<RouteSummary>,
}

// ORS leaves distance/duration out of the summary when both endpoints snap
// to the same point.
#[derive(Deserialize)]
struct RouteSummary {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
}

#[derive(Debug, Clone)]
pub struct OrsDirectionsClientParams {
    pub api_key: Option<String>,
    pub base_url: String,
    pub profile: DirectionsProfile,
    pub preference: Option<RoutePreference>,
    pub geometry_simplify: Option<bool>,
    pub extra_info: Vec<String>,
    pub densify: bool,
}

impl Default for OrsDirectionsClientParams {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: ORS_API_URL.to_string(),
            profile: DirectionsProfile::DrivingCar,
            preference: None,
            geometry_simplify: None,
            extra_info: Vec::new(),
            densify: false,
        }
    }
}

pub struct OrsDirectionsClient<T> {
    params: OrsDirectionsClientParams,
    transport: T,
}

impl<T: DirectionsTransport> OrsDirectionsClient<T> {
    pub fn new(params: OrsDirectionsClientParams, transport: T) -> Self {
        Self { params, transport }
    }

    pub fn params(&self) -> &OrsDirectionsClientParams {
        &self.params
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The configured credential, if it is usable.
    pub fn credential(&self) -> Option<&str> {
        self.params
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn has_credential(&self) -> bool {
        self.credential().is_some()
    }

    pub fn directions_url(&self) -> String {
        format!(
            "{}/v2/directions/{}/geojson",
            self.params.base_url.trim_end_matches('/'),
            self.params.profile
        )
    }

    pub fn request_body(&self, start: &Coordinate, end: &Coordinate) -> DirectionsRequestBody {
        DirectionsRequestBody {
            coordinates: vec![start.to_lon_lat(), end.to_lon_lat()],
            preference: self.params.preference,
            geometry_simplify: self.params.geometry_simplify,
            extra_info: if self.params.extra_info.is_empty() {
                None
            } else {
                Some(self.params.extra_info.clone())
            },
        }
    }

    /// Performs exactly one directions request between `start` and `end`.
    ///
    /// Resolves to [`DirectionsError::Canceled`] if `cancel` fires first; the
    /// in-progress transport future is dropped in that case.
    pub async fn fetch_route(
        &self,
        start: Coordinate,
        end: Coordinate,
        cancel: &CancellationToken,
    ) -> Result<RouteResult, DirectionsError> {
        let credential = self
            .credential()
            .ok_or(DirectionsError::MissingCredential)?;

        if cancel.is_cancelled() {
            return Err(DirectionsError::Canceled);
        }

        let url = self.directions_url();
        let body = self.request_body(&start, &end);

        debug!("OrsDirections: Requesting route {} -> {}", start, end);

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DirectionsError::Canceled),
            response = self.transport.post_json(&url, credential, &body) => response?,
        };

        if !response.is_success() {
            let message = match serde_json::from_str::<OrsErrorPayload>(&response.body) {
                Ok(payload) => format!("{} (code {})", payload.error.message, payload.error.code),
                Err(_) => response.body,
            };
            warn!(
                "OrsDirections: API returned status {}: {}",
                response.status, message
            );
            return Err(DirectionsError::Api {
                status: response.status,
                message,
            });
        }

        let mut route = parse_route(&response.body)?;

        if self.params.densify {
            route.polyline = densify(&route.polyline);
        }

        debug!(
            "OrsDirections: Route has {} points, {} m, {} s",
            route.polyline.len(),
            route.distance_meters,
            route.duration_seconds
        );

        Ok(route)
    }
}

fn parse_route(body: &str) -> Result<RouteResult, DirectionsError> {
    let response: DirectionsResponse = serde_json::from_str(body)?;

    let feature = response
        .features
        .into_iter()
        .next()
        .ok_or(DirectionsError::MissingField("features[0]"))?;

    let geometry = feature
        .geometry
        .ok_or(DirectionsError::MissingField("features[0].geometry"))?;
    let summary = feature
        .properties
        .and_then(|properties| properties.summary)
        .ok_or(DirectionsError::MissingField("features[0].properties.summary"))?;

    let polyline = geometry
        .coordinates
        .into_iter()
        .map(|pair| {
            Coordinate::from_lon_lat(pair)
                .map_err(|_| DirectionsError::MissingField("valid geometry coordinates"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if polyline.len() < 2 {
        return Err(DirectionsError::MissingField(
            "features[0].geometry.coordinates",
        ));
    }

    Ok(RouteResult {
        polyline,
        distance_meters: summary.distance,
        duration_seconds: summary.duration,
    })
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use crate::{error::FetchErrorKind, transport::TransportResponse};

    use super::*;

    const SAMPLE_RESPONSE: &str = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "geometry": {
                "type": "LineString",
                "coordinates": [[77.59, 12.90], [77.60, 12.93], [77.59, 12.97]]
            },
            "properties": {
                "summary": { "distance": 12345.0, "duration": 1800.0 }
            }
        }]
    }"#;

    struct MockTransport {
        response: Result<TransportResponse, u16>,
        delay: Option<Duration>,
        calls: AtomicUsize,
        last_request: Mutex<Option<(String, String, DirectionsRequestBody)>>,
    }

    impl MockTransport {
        fn ok(body: &str) -> Self {
            Self::with_status(200, body)
        }

        fn with_status(status: u16, body: &str) -> Self {
            Self {
                response: Ok(TransportResponse {
                    status,
                    body: body.to_string(),
                }),
                delay: None,
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl DirectionsTransport for MockTransport {
        async fn post_json(
            &self,
            url: &str,
            credential: &str,
            body: &DirectionsRequestBody,
        ) -> Result<TransportResponse, DirectionsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() =
                Some((url.to_string(), credential.to_string(), body.clone()));

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            match &self.response {
                Ok(response) => Ok(response.clone()),
                Err(status) => Err(DirectionsError::Api {
                    status: *status,
                    message: "connection reset".to_string(),
                }),
            }
        }
    }

    fn client(api_key: Option<&str>, transport: MockTransport) -> OrsDirectionsClient<MockTransport> {
        OrsDirectionsClient::new(
            OrsDirectionsClientParams {
                api_key: api_key.map(str::to_string),
                ..Default::default()
            },
            transport,
        )
    }

    fn start() -> Coordinate {
        Coordinate::new(12.90, 77.59).unwrap()
    }

    fn end() -> Coordinate {
        Coordinate::new(12.97, 77.59).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_route_parses_geojson() {
        let client = client(Some("secret"), MockTransport::ok(SAMPLE_RESPONSE));

        let route = client
            .fetch_route(start(), end(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(route.distance_meters, 12345.0);
        assert_eq!(route.duration_seconds, 1800.0);
        assert_eq!(route.polyline.len(), 3);
        assert_eq!(route.polyline[0], start());
        assert_eq!(route.polyline[2], end());
        assert_eq!(route.distance_label(), "12.35 km");
        assert_eq!(route.duration_label(), "30 min");
    }

    #[tokio::test]
    async fn test_fetch_route_sends_wire_contract() {
        let client = client(Some("secret"), MockTransport::ok(SAMPLE_RESPONSE));
        client
            .fetch_route(start(), end(), &CancellationToken::new())
            .await
            .unwrap();

        let (url, credential, body) = client
            .transport()
            .last_request
            .lock()
            .unwrap()
            .clone()
            .unwrap();

        assert_eq!(
            url,
            "https://api.openrouteservice.org/v2/directions/driving-car/geojson"
        );
        assert_eq!(credential, "secret");
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({ "coordinates": [[77.59, 12.90], [77.59, 12.97]] })
        );
    }

    #[tokio::test]
    async fn test_request_body_optional_fields() {
        let client = OrsDirectionsClient::new(
            OrsDirectionsClientParams {
                api_key: Some("secret".to_string()),
                preference: Some(RoutePreference::Fastest),
                geometry_simplify: Some(false),
                extra_info: vec!["waytype".to_string()],
                ..Default::default()
            },
            MockTransport::ok(SAMPLE_RESPONSE),
        );

        let body = client.request_body(&start(), &end());
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "coordinates": [[77.59, 12.90], [77.59, 12.97]],
                "preference": "fastest",
                "geometry_simplify": false,
                "extra_info": ["waytype"],
            })
        );
    }

    #[tokio::test]
    async fn test_missing_credential_makes_no_call() {
        for key in [None, Some(""), Some("   ")] {
            let client = client(key, MockTransport::ok(SAMPLE_RESPONSE));

            let error = client
                .fetch_route(start(), end(), &CancellationToken::new())
                .await
                .unwrap_err();

            assert_eq!(error.kind(), FetchErrorKind::MissingCredential);
            assert_eq!(client.transport().calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_densify_applied_when_enabled() {
        let client = OrsDirectionsClient::new(
            OrsDirectionsClientParams {
                api_key: Some("secret".to_string()),
                densify: true,
                ..Default::default()
            },
            MockTransport::ok(SAMPLE_RESPONSE),
        );

        let route = client
            .fetch_route(start(), end(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(route.polyline.len(), 5);
        assert_eq!(route.polyline[0], start());
        assert_eq!(route.polyline[4], end());
    }

    #[tokio::test]
    async fn test_malformed_responses() {
        let bodies = [
            "not json",
            r#"{"features": []}"#,
            r#"{"features": [{"geometry": {"coordinates": []}, "properties": {}}]}"#,
            r#"{"features": [{"properties": {"summary": {"distance": 1.0, "duration": 1.0}}}]}"#,
            r#"{"features": [{"geometry": {"coordinates": [[200.0, 0.0]]},
                "properties": {"summary": {"distance": 1.0, "duration": 1.0}}}]}"#,
            r#"{"features": [{"geometry": {"coordinates": []},
                "properties": {"summary": {"distance": 1.0, "duration": 1.0}}}]}"#,
            r#"{"features": [{"geometry": {"coordinates": [[77.59, 12.90]]},
                "properties": {"summary": {"distance": 1.0, "duration": 1.0}}}]}"#,
        ];

        for body in bodies {
            let client = client(Some("secret"), MockTransport::ok(body));
            let error = client
                .fetch_route(start(), end(), &CancellationToken::new())
                .await
                .unwrap_err();

            assert_eq!(error.kind(), FetchErrorKind::MalformedResponse, "{}", body);
        }
    }

    #[tokio::test]
    async fn test_api_error_is_network_error() {
        let client = client(
            Some("secret"),
            MockTransport::with_status(
                403,
                r#"{"error": {"code": 403, "message": "Daily quota reached"}}"#,
            ),
        );

        let error = client
            .fetch_route(start(), end(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(error.kind(), FetchErrorKind::NetworkError);
        match error {
            DirectionsError::Api { status, message } => {
                assert_eq!(status, 403);
                assert!(message.contains("Daily quota reached"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_failure_is_network_error() {
        let mut transport = MockTransport::ok(SAMPLE_RESPONSE);
        transport.response = Err(502);
        let client = client(Some("secret"), transport);

        let error = client
            .fetch_route(start(), end(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(error.kind(), FetchErrorKind::NetworkError);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_request() {
        let mut transport = MockTransport::ok(SAMPLE_RESPONSE);
        transport.delay = Some(Duration::from_secs(60));
        let client = client(Some("secret"), transport);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let error = client.fetch_route(start(), end(), &cancel).await.unwrap_err();

        assert!(error.is_canceled());
        assert_eq!(client.transport().calls(), 1);
    }

    #[tokio::test]
    async fn test_cancel_before_request() {
        let client = client(Some("secret"), MockTransport::ok(SAMPLE_RESPONSE));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let error = client.fetch_route(start(), end(), &cancel).await.unwrap_err();

        assert_eq!(error.kind(), FetchErrorKind::Canceled);
        assert_eq!(client.transport().calls(), 0);
    }
}
