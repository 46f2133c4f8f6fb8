//! Render surface seam: what the managers draw onto, plus an in-memory scene.

use std::{collections::BTreeMap, sync::Arc};

use shared::domain::{Edge, LatLon, PoiKind};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerId(pub u64);

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tag that decides which manager owns a visual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerCategory {
    Route,
    BlockedRoad,
    PointOfInterest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteVariant {
    Primary,
    Alternative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolylineStyle {
    pub color: &'static str,
    pub weight: u8,
    pub dash_array: Option<&'static str>,
}

impl RouteVariant {
    pub fn style(self) -> PolylineStyle {
        match self {
            Self::Primary => PolylineStyle {
                color: "blue",
                weight: 4,
                dash_array: None,
            },
            Self::Alternative => PolylineStyle {
                color: "red",
                weight: 4,
                dash_array: Some("5, 10"),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub category: LayerCategory,
    pub variant: RouteVariant,
    pub points: Vec<LatLon>,
    pub style: PolylineStyle,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadePhase {
    FadingIn,
    FadingOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerIcon {
    Roadblock,
    Poi(PoiKind),
}

/// Click handler bound to a marker. Holds its own copy of whatever it acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerAction {
    UnblockOnClick { edge: Edge },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub category: LayerCategory,
    pub position: LatLon,
    pub icon: MarkerIcon,
    pub label: String,
    pub phase: Option<FadePhase>,
    pub on_click: Option<MarkerAction>,
}

/// Rendering never fails at this layer.
pub trait MapSurface: Send {
    fn add_polyline(&mut self, polyline: Polyline) -> LayerId;
    fn add_marker(&mut self, marker: Marker) -> LayerId;
    fn set_fade_phase(&mut self, id: LayerId, phase: FadePhase);
    /// Returns false when the layer was already gone.
    fn remove_layer(&mut self, id: LayerId) -> bool;
    fn layers_in(&self, category: LayerCategory) -> Vec<LayerId>;
    fn marker_action(&self, id: LayerId) -> Option<MarkerAction>;
    /// Closest interactive marker within `tolerance_deg` of `point`.
    fn hit_marker(&self, point: LatLon, tolerance_deg: f64) -> Option<LayerId>;
    fn open_popup(&mut self, id: LayerId);
    fn close_popup(&mut self);
}

pub type SharedSurface = Arc<Mutex<dyn MapSurface>>;

#[derive(Debug, Clone, PartialEq)]
pub enum SceneLayer {
    Polyline(Polyline),
    Marker(Marker),
}

impl SceneLayer {
    pub fn category(&self) -> LayerCategory {
        match self {
            Self::Polyline(polyline) => polyline.category,
            Self::Marker(marker) => marker.category,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Polyline(polyline) => &polyline.label,
            Self::Marker(marker) => &marker.label,
        }
    }
}

/// In-memory surface used by the terminal front-end and the tests.
#[derive(Debug, Default)]
pub struct SceneSurface {
    next_id: u64,
    layers: BTreeMap<LayerId, SceneLayer>,
    open_popup: Option<LayerId>,
    removed: Vec<LayerId>,
}

impl SceneSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn layers(&self) -> impl Iterator<Item = (LayerId, &SceneLayer)> {
        self.layers.iter().map(|(id, layer)| (*id, layer))
    }

    pub fn layer(&self, id: LayerId) -> Option<&SceneLayer> {
        self.layers.get(&id)
    }

    pub fn polylines(&self) -> impl Iterator<Item = &Polyline> {
        self.layers.values().filter_map(|layer| match layer {
            SceneLayer::Polyline(polyline) => Some(polyline),
            SceneLayer::Marker(_) => None,
        })
    }

    pub fn markers_in(&self, category: LayerCategory) -> Vec<(LayerId, &Marker)> {
        self.layers
            .iter()
            .filter_map(|(id, layer)| match layer {
                SceneLayer::Marker(marker) if marker.category == category => Some((*id, marker)),
                _ => None,
            })
            .collect()
    }

    pub fn open_popup_layer(&self) -> Option<LayerId> {
        self.open_popup
    }

    /// Every successful removal, in order.
    pub fn removed_layers(&self) -> &[LayerId] {
        &self.removed
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    fn insert(&mut self, layer: SceneLayer) -> LayerId {
        self.next_id += 1;
        let id = LayerId(self.next_id);
        self.layers.insert(id, layer);
        id
    }
}

impl MapSurface for SceneSurface {
    fn add_polyline(&mut self, polyline: Polyline) -> LayerId {
        self.insert(SceneLayer::Polyline(polyline))
    }

    fn add_marker(&mut self, marker: Marker) -> LayerId {
        self.insert(SceneLayer::Marker(marker))
    }

    fn set_fade_phase(&mut self, id: LayerId, phase: FadePhase) {
        if let Some(SceneLayer::Marker(marker)) = self.layers.get_mut(&id) {
            marker.phase = Some(phase);
        }
    }

    fn remove_layer(&mut self, id: LayerId) -> bool {
        if self.layers.remove(&id).is_none() {
            return false;
        }
        if self.open_popup == Some(id) {
            self.open_popup = None;
        }
        self.removed.push(id);
        true
    }

    fn layers_in(&self, category: LayerCategory) -> Vec<LayerId> {
        self.layers
            .iter()
            .filter(|(_, layer)| layer.category() == category)
            .map(|(id, _)| *id)
            .collect()
    }

    fn marker_action(&self, id: LayerId) -> Option<MarkerAction> {
        match self.layers.get(&id)? {
            SceneLayer::Marker(marker) => marker.on_click,
            SceneLayer::Polyline(_) => None,
        }
    }

    fn hit_marker(&self, point: LatLon, tolerance_deg: f64) -> Option<LayerId> {
        self.layers
            .iter()
            .filter_map(|(id, layer)| match layer {
                SceneLayer::Marker(marker) if marker.on_click.is_some() => {
                    let distance = marker.position.max_delta(&point);
                    (distance <= tolerance_deg).then_some((*id, distance))
                }
                _ => None,
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    fn open_popup(&mut self, id: LayerId) {
        if self.layers.contains_key(&id) {
            self.open_popup = Some(id);
        }
    }

    fn close_popup(&mut self) {
        self.open_popup = None;
    }
}
