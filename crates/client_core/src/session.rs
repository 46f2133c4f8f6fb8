use std::sync::Arc;

use shared::{
    domain::{LatLon, NodeId},
    error::BackendError,
};
use tracing::{debug, info, warn};

use crate::{
    backend::RoutingBackend,
    config::ClientSettings,
    markers::BlockedRoadMarkerManager,
    orchestrator::{ClickOutcome, MutationOutcome, RefreshOutcome, SyncComponents, SyncOrchestrator},
    poi_layers::PointOfInterestLayerManager,
    route_layers::RouteLayerManager,
    surface::{LayerId, MarkerAction, SharedSurface},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapEvent {
    MapClick(LatLon),
    MarkerClick(LayerId),
    CancelSelection,
    Reload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Click(ClickOutcome),
    Unblock(MutationOutcome),
    SelectionCancelled(Option<NodeId>),
    Reloaded(RefreshOutcome),
    /// Click on a layer with no action, or on one that no longer exists.
    Ignored,
    Failed(BackendError),
}

/// Owns everything one map view needs: the surface, the layer managers and the
/// orchestrator that sequences them.
pub struct MapSessionController {
    surface: SharedSurface,
    orchestrator: SyncOrchestrator,
    hit_tolerance_deg: f64,
}

impl MapSessionController {
    pub fn init(
        settings: &ClientSettings,
        backend: Arc<dyn RoutingBackend>,
        surface: SharedSurface,
    ) -> Self {
        let components = SyncComponents {
            routes: RouteLayerManager::new(surface.clone()),
            markers: BlockedRoadMarkerManager::new(surface.clone(), settings.fade_duration()),
            points: PointOfInterestLayerManager::new(surface.clone()),
        };
        Self {
            surface,
            orchestrator: SyncOrchestrator::new(
                backend,
                components,
                settings.refresh_routes_on_block,
            ),
            hit_tolerance_deg: settings.marker_hit_tolerance_deg,
        }
    }

    pub fn orchestrator(&self) -> &SyncOrchestrator {
        &self.orchestrator
    }

    pub fn surface(&self) -> &SharedSurface {
        &self.surface
    }

    pub async fn initial_load(&self) -> Result<RefreshOutcome, BackendError> {
        let outcome = self.orchestrator.initial_load().await?;
        info!(?outcome, "session: initial view loaded");
        Ok(outcome)
    }

    /// Never fails: backend errors come back as [`SessionOutcome::Failed`] and
    /// leave the current render in place.
    pub async fn handle(&self, event: MapEvent) -> SessionOutcome {
        let outcome = match event {
            MapEvent::MapClick(point) => self.map_click(point).await,
            MapEvent::MarkerClick(layer) => self.marker_click(layer).await,
            MapEvent::CancelSelection => Ok(SessionOutcome::SelectionCancelled(
                self.orchestrator.reset_selection().await,
            )),
            MapEvent::Reload => self
                .orchestrator
                .refresh_routes()
                .await
                .map(SessionOutcome::Reloaded),
        };
        outcome.unwrap_or_else(|err| {
            warn!(?event, error = %err, "session: event left the view unchanged");
            SessionOutcome::Failed(err)
        })
    }

    pub async fn teardown(&self) {
        self.orchestrator.teardown().await;
        self.surface.lock().await.close_popup();
        info!("session: torn down");
    }

    async fn map_click(&self, point: LatLon) -> Result<SessionOutcome, BackendError> {
        let hit = {
            let mut surface = self.surface.lock().await;
            let hit = surface.hit_marker(point, self.hit_tolerance_deg);
            if hit.is_none() {
                surface.close_popup();
            }
            hit
        };
        if let Some(layer) = hit {
            debug!(layer = layer.0, "session: map click landed on a marker");
            return self.marker_click(layer).await;
        }
        self.orchestrator
            .handle_map_click(point)
            .await
            .map(SessionOutcome::Click)
    }

    async fn marker_click(&self, layer: LayerId) -> Result<SessionOutcome, BackendError> {
        let action = {
            let mut surface = self.surface.lock().await;
            surface.open_popup(layer);
            surface.marker_action(layer)
        };
        match action {
            Some(MarkerAction::UnblockOnClick { edge }) => self
                .orchestrator
                .unblock_edge(edge)
                .await
                .map(SessionOutcome::Unblock),
            None => Ok(SessionOutcome::Ignored),
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
