use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::ZoneId;

pub const RED: &str = "#E53935";
pub const ORANGE: &str = "#FB8C00";
pub const GREEN: &str = "#34A853";

pub const MIN_OPACITY: f64 = 0.1;
pub const MAX_OPACITY: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        LatLng { lat, lng }
    }

    fn pair(self) -> [f64; 2] {
        [self.lat, self.lng]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryType {
    Rectangle,
    Polygon,
    Circle,
}

/// Geometry carried by the map's draw-completion callback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DrawnShape {
    Rectangle { south_west: LatLng, north_east: LatLng },
    Polygon { vertices: Vec<LatLng> },
    Circle { center: LatLng, radius_m: f64 },
}

impl DrawnShape {
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            DrawnShape::Rectangle { .. } => GeometryType::Rectangle,
            DrawnShape::Polygon { .. } => GeometryType::Polygon,
            DrawnShape::Circle { .. } => GeometryType::Circle,
        }
    }

    /// Outline as `[lat, lng]` pairs. Rectangles expand to four corners
    /// (clockwise from south-west); circles reduce to their centre.
    pub fn coordinates(&self) -> Vec<[f64; 2]> {
        match self {
            DrawnShape::Rectangle { south_west: sw, north_east: ne } => vec![
                sw.pair(),
                [ne.lat, sw.lng],
                ne.pair(),
                [sw.lat, ne.lng],
            ],
            DrawnShape::Polygon { vertices } => vertices.iter().map(|v| v.pair()).collect(),
            DrawnShape::Circle { center, .. } => vec![center.pair()],
        }
    }

    pub fn radius_m(&self) -> Option<f64> {
        match self {
            DrawnShape::Circle { radius_m, .. } => Some(*radius_m),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RiskBand {
    Low,
    Moderate,
    High,
}

impl RiskBand {
    pub fn from_score(score: u8) -> Self {
        if score >= 70 {
            RiskBand::High
        } else if score >= 40 {
            RiskBand::Moderate
        } else {
            RiskBand::Low
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            RiskBand::High => RED,
            RiskBand::Moderate => ORANGE,
            RiskBand::Low => GREEN,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskBand::High => "High Risk",
            RiskBand::Moderate => "Moderate Risk",
            RiskBand::Low => "Low Risk",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeStyle {
    pub color: &'static str,
    pub fill_opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Zone {
    pub id: ZoneId,
    pub geometry_type: GeometryType,
    pub coordinates: Vec<[f64; 2]>,
    pub radius_m: Option<f64>,
    pub risk_score: u8,
    pub display_color: &'static str,
    pub style: ShapeStyle,
    pub popup: String,
}

impl Zone {
    pub fn band(&self) -> RiskBand {
        RiskBand::from_score(self.risk_score)
    }
}

/// User-drawn zones. Append-only; growth is unbounded unless a cap is
/// configured, in which case the oldest zone is dropped.
#[derive(Debug, Clone, Default)]
pub struct ZoneLayer {
    zones: Vec<Zone>,
    cap: Option<usize>,
    next_id: u64,
}

impl ZoneLayer {
    pub fn new(cap: Option<usize>) -> Self {
        ZoneLayer { zones: Vec::new(), cap, next_id: 1 }
    }

    /// Draw a score in [0, 100] and record the shape as a zone.
    pub fn on_shape_completed(&mut self, shape: &DrawnShape, rng: &mut impl Rng) -> &Zone {
        let score = rng.random_range(0..=100u8);
        self.record(shape, score)
    }

    /// Record a shape with a known score. Scores above 100 are clamped.
    pub fn record(&mut self, shape: &DrawnShape, score: u8) -> &Zone {
        let score = score.min(100);
        let band = RiskBand::from_score(score);
        let id = ZoneId(self.next_id);
        self.next_id += 1;

        let zone = Zone {
            id,
            geometry_type: shape.geometry_type(),
            coordinates: shape.coordinates(),
            radius_m: shape.radius_m(),
            risk_score: score,
            display_color: band.color(),
            style: ShapeStyle { color: band.color(), fill_opacity: 0.5 },
            popup: format!("Risk Score: {score} ({})", band.label()),
        };
        info!(zone = id.0, geometry = ?zone.geometry_type, score, "zone recorded");

        if let Some(cap) = self.cap
            && cap > 0
            && self.zones.len() >= cap
        {
            self.zones.remove(0);
        }
        self.zones.push(zone);
        // Just pushed, so non-empty.
        &self.zones[self.zones.len() - 1]
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Overlay {
    #[default]
    None,
    Ndvi,
    Rainfall,
    RiskHeatmap,
}

/// A static per-region reading shown by the overlays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionMarker {
    pub region: &'static str,
    pub position: LatLng,
    pub ndvi: f64,
    pub rainfall_mm: f64,
    pub risk: f64,
}

pub const REGION_MARKERS: [RegionMarker; 7] = [
    RegionMarker { region: "Makueni", position: LatLng::new(-1.8039, 37.6200), ndvi: 0.28, rainfall_mm: 35.0, risk: 82.0 },
    RegionMarker { region: "Kitui", position: LatLng::new(-1.3667, 38.0106), ndvi: 0.35, rainfall_mm: 48.0, risk: 74.0 },
    RegionMarker { region: "Machakos", position: LatLng::new(-1.5177, 37.2634), ndvi: 0.42, rainfall_mm: 62.0, risk: 58.0 },
    RegionMarker { region: "Nairobi", position: LatLng::new(-1.2921, 36.8219), ndvi: 0.48, rainfall_mm: 78.0, risk: 45.0 },
    RegionMarker { region: "Nakuru", position: LatLng::new(-0.3031, 36.0800), ndvi: 0.61, rainfall_mm: 96.0, risk: 33.0 },
    RegionMarker { region: "Meru", position: LatLng::new(0.0470, 37.6498), ndvi: 0.68, rainfall_mm: 112.0, risk: 24.0 },
    RegionMarker { region: "Kisumu", position: LatLng::new(-0.0917, 34.7680), ndvi: 0.65, rainfall_mm: 125.0, risk: 21.0 },
];

impl Overlay {
    /// Colour a marker by this overlay's metric. `None` for the empty overlay.
    pub fn classify(self, marker: &RegionMarker) -> Option<(&'static str, f64)> {
        let (value, color) = match self {
            Overlay::None => return None,
            // Higher vegetation and rainfall are healthier.
            Overlay::Ndvi => (
                marker.ndvi,
                if marker.ndvi >= 0.6 {
                    GREEN
                } else if marker.ndvi >= 0.4 {
                    ORANGE
                } else {
                    RED
                },
            ),
            Overlay::Rainfall => (
                marker.rainfall_mm,
                if marker.rainfall_mm >= 100.0 {
                    GREEN
                } else if marker.rainfall_mm >= 60.0 {
                    ORANGE
                } else {
                    RED
                },
            ),
            Overlay::RiskHeatmap => (
                marker.risk,
                if marker.risk >= 70.0 {
                    RED
                } else if marker.risk >= 40.0 {
                    ORANGE
                } else {
                    GREEN
                },
            ),
        };
        Some((color, value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerStyle {
    pub region: &'static str,
    pub position: LatLng,
    pub value: f64,
    pub color: &'static str,
    pub fill_opacity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayState {
    pub overlay: Overlay,
    opacity: f64,
}

impl Default for OverlayState {
    fn default() -> Self {
        OverlayState { overlay: Overlay::None, opacity: 0.7 }
    }
}

impl OverlayState {
    pub fn select(&mut self, overlay: Overlay) {
        self.overlay = overlay;
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    /// The slider only responds while an overlay is shown. Values are clamped
    /// to [0.1, 1.0]. Returns whether the change was applied.
    pub fn set_opacity(&mut self, opacity: f64) -> bool {
        if self.overlay == Overlay::None || opacity.is_nan() {
            return false;
        }
        self.opacity = opacity.clamp(MIN_OPACITY, MAX_OPACITY);
        true
    }

    pub fn markers(&self) -> Vec<MarkerStyle> {
        REGION_MARKERS
            .iter()
            .filter_map(|m| {
                self.overlay.classify(m).map(|(color, value)| MarkerStyle {
                    region: m.region,
                    position: m.position,
                    value,
                    color,
                    fill_opacity: self.opacity,
                })
            })
            .collect()
    }
}

/// Everything the map page owns.
#[derive(Debug, Clone)]
pub struct MapView {
    pub center: LatLng,
    pub zoom: u8,
    pub zones: ZoneLayer,
    pub overlay: OverlayState,
}

impl MapView {
    pub fn new(center: LatLng, zoom: u8, zone_cap: Option<usize>) -> Self {
        MapView { center, zoom, zones: ZoneLayer::new(zone_cap), overlay: OverlayState::default() }
    }
}
