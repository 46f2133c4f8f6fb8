use shared::domain::PointOfInterest;

use crate::surface::{LayerCategory, Marker, MarkerIcon, SharedSurface};

/// Static points of interest. Plain markers with no click action.
pub struct PointOfInterestLayerManager {
    surface: SharedSurface,
}

impl PointOfInterestLayerManager {
    pub fn new(surface: SharedSurface) -> Self {
        Self { surface }
    }

    pub async fn refresh(&self, points: &[PointOfInterest]) -> usize {
        let mut surface = self.surface.lock().await;
        for id in surface.layers_in(LayerCategory::PointOfInterest) {
            surface.remove_layer(id);
        }
        for point in points {
            surface.add_marker(Marker {
                category: LayerCategory::PointOfInterest,
                position: point.position,
                icon: MarkerIcon::Poi(point.kind),
                label: point.name.clone(),
                phase: None,
                on_click: None,
            });
        }
        points.len()
    }

    pub async fn teardown(&self) {
        let mut surface = self.surface.lock().await;
        for id in surface.layers_in(LayerCategory::PointOfInterest) {
            surface.remove_layer(id);
        }
    }
}
