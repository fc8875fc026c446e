use geo::BoundingRect;
use serde::Serialize;
use tracing::info;
use waymark_directions::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MarkerRole {
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MarkerColor {
    Green,
    Red,
}

impl MarkerRole {
    pub fn color(&self) -> MarkerColor {
        match self {
            MarkerRole::Start => MarkerColor::Green,
            MarkerRole::End => MarkerColor::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Marker {
    pub coordinate: Coordinate,
    pub role: MarkerRole,
}

/// Everything the map shows for the current session state.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MapScene {
    pub markers: Vec<Marker>,
    pub polyline: Vec<Coordinate>,
    pub user_location: Option<Coordinate>,
}

/// Padding in screen points kept between the fitted content and each edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EdgePadding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl EdgePadding {
    pub const fn uniform(value: f64) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }
}

impl Default for EdgePadding {
    fn default() -> Self {
        EdgePadding::uniform(50.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraRegion {
    pub south_west: Coordinate,
    pub north_east: Coordinate,
    pub padding: EdgePadding,
}

impl CameraRegion {
    /// Smallest region covering every point, `None` for an empty slice.
    pub fn fit(points: &[Coordinate], padding: EdgePadding) -> Option<Self> {
        let multi_point: geo_types::MultiPoint<f64> = points
            .iter()
            .map(geo_types::Point::<f64>::from)
            .collect();
        Self::from_rect(multi_point.bounding_rect()?, padding)
    }

    /// `None` if the rectangle reaches outside valid coordinates.
    pub fn from_rect(rect: geo_types::Rect<f64>, padding: EdgePadding) -> Option<Self> {
        Some(Self {
            south_west: Coordinate::new(rect.min().y, rect.min().x).ok()?,
            north_east: Coordinate::new(rect.max().y, rect.max().x).ok()?,
            padding,
        })
    }

    pub fn contains(&self, point: &Coordinate) -> bool {
        (self.south_west.latitude()..=self.north_east.latitude()).contains(&point.latitude())
            && (self.south_west.longitude()..=self.north_east.longitude())
                .contains(&point.longitude())
    }

    pub fn center(&self) -> Coordinate {
        self.south_west.midpoint(&self.north_east)
    }
}

/// The rendering side of the session. Implementations draw markers, the
/// route polyline and move the camera.
pub trait MapView {
    fn render(&mut self, scene: &MapScene);

    fn fit_camera(&mut self, region: CameraRegion);
}

/// A map view that only reports what it would draw.
#[derive(Default)]
pub struct TracingMapView;

impl MapView for TracingMapView {
    fn render(&mut self, scene: &MapScene) {
        let markers = scene
            .markers
            .iter()
            .map(|marker| format!("{:?}({:?}) {}", marker.role, marker.role.color(), marker.coordinate))
            .collect::<Vec<_>>();

        info!(
            "Map: markers [{}], polyline {} points",
            markers.join(", "),
            scene.polyline.len()
        );
    }

    fn fit_camera(&mut self, region: CameraRegion) {
        info!(
            "Map: fit camera {} .. {} (center {})",
            region.south_west,
            region.north_east,
            region.center()
        );
    }
}
