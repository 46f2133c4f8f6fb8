use shared::domain::{LatLon, RouteSet};

use crate::surface::{LayerCategory, Polyline, RouteVariant, SharedSurface};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteRenderSummary {
    pub primary: usize,
    pub alternative: usize,
}

/// Owns every polyline tagged [`LayerCategory::Route`].
pub struct RouteLayerManager {
    surface: SharedSurface,
}

impl RouteLayerManager {
    pub fn new(surface: SharedSurface) -> Self {
        Self { surface }
    }

    /// Replaces all route polylines with the given set in one surface lock.
    pub async fn refresh(&self, routes: &RouteSet) -> RouteRenderSummary {
        let mut surface = self.surface.lock().await;
        for id in surface.layers_in(LayerCategory::Route) {
            surface.remove_layer(id);
        }

        let mut summary = RouteRenderSummary::default();
        for (town, town_routes) in routes {
            if !town_routes.primary.is_empty() {
                surface.add_polyline(route_polyline(
                    RouteVariant::Primary,
                    town,
                    &town_routes.primary,
                ));
                summary.primary += 1;
            }
            if !town_routes.alternative.is_empty() {
                surface.add_polyline(route_polyline(
                    RouteVariant::Alternative,
                    town,
                    &town_routes.alternative,
                ));
                summary.alternative += 1;
            }
        }
        summary
    }

    pub async fn teardown(&self) {
        let mut surface = self.surface.lock().await;
        for id in surface.layers_in(LayerCategory::Route) {
            surface.remove_layer(id);
        }
    }
}

fn route_polyline(variant: RouteVariant, town: &str, points: &[LatLon]) -> Polyline {
    let label = match variant {
        RouteVariant::Primary => format!("Primary route to {town}"),
        RouteVariant::Alternative => format!("Alternative route to {town}"),
    };
    Polyline {
        category: LayerCategory::Route,
        variant,
        points: points.to_vec(),
        style: variant.style(),
        label,
    }
}

#[cfg(test)]
#[path = "tests/route_layers_tests.rs"]
mod tests;
