//! Sequencing of backend round-trips and layer refreshes.
//!
//! Each chain (mutation, then re-fetch, then render) stops at its first failed
//! request and leaves whatever was rendered before. Results are applied only
//! when their refresh token is still the newest one issued for that kind of
//! data, so a slow response cannot overwrite a newer one.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use shared::{
    domain::{BlockedRoadSet, Edge, LatLon, NodeId},
    error::BackendError,
};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::{
    backend::RoutingBackend,
    markers::BlockedRoadMarkerManager,
    poi_layers::PointOfInterestLayerManager,
    route_layers::RouteLayerManager,
    selector::{BlockedEdgeSelector, SelectionOutcome, SelectionState},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshToken(u64);

#[derive(Debug, Default)]
struct RefreshTokens {
    latest: AtomicU64,
}

impl RefreshTokens {
    fn issue(&self) -> RefreshToken {
        RefreshToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn is_current(&self, token: RefreshToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    /// A newer refresh of the same kind was issued; this result was dropped.
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Applied(RefreshOutcome),
    AlreadyBlocked,
    AlreadyInFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    FirstNodeSelected(NodeId),
    SameNodeIgnored(NodeId),
    AlreadyBlocked(Edge),
    BlockRequested(Edge, MutationOutcome),
}

pub struct SyncComponents {
    pub routes: RouteLayerManager,
    pub markers: Arc<BlockedRoadMarkerManager>,
    pub points: PointOfInterestLayerManager,
}

pub struct SyncOrchestrator {
    backend: Arc<dyn RoutingBackend>,
    routes: RouteLayerManager,
    markers: Arc<BlockedRoadMarkerManager>,
    points: PointOfInterestLayerManager,
    // Held across the nearest-node lookup: overlapping clicks queue in order.
    selector: Mutex<BlockedEdgeSelector>,
    blocked: RwLock<BlockedRoadSet>,
    in_flight: Mutex<HashSet<Edge>>,
    route_tokens: RefreshTokens,
    blocked_tokens: RefreshTokens,
    apply_lock: Mutex<()>,
    refresh_routes_on_block: bool,
}

impl SyncOrchestrator {
    pub fn new(
        backend: Arc<dyn RoutingBackend>,
        components: SyncComponents,
        refresh_routes_on_block: bool,
    ) -> Self {
        Self {
            backend,
            routes: components.routes,
            markers: components.markers,
            points: components.points,
            selector: Mutex::new(BlockedEdgeSelector::new()),
            blocked: RwLock::new(BlockedRoadSet::default()),
            in_flight: Mutex::new(HashSet::new()),
            route_tokens: RefreshTokens::default(),
            blocked_tokens: RefreshTokens::default(),
            apply_lock: Mutex::new(()),
            refresh_routes_on_block,
        }
    }

    /// Routes first, then the blocked set, then points of interest as an
    /// independent chain whose failure is only logged.
    pub async fn initial_load(&self) -> Result<RefreshOutcome, BackendError> {
        let outcome = self.refresh_routes().await;
        if let Err(err) = self.load_points_of_interest().await {
            warn!(error = %err, "sync: points of interest unavailable");
        }
        outcome
    }

    /// Fetches and renders routes, then runs the companion blocked-road refresh.
    pub async fn refresh_routes(&self) -> Result<RefreshOutcome, BackendError> {
        let token = self.route_tokens.issue();
        let routes = self
            .backend
            .fetch_routes()
            .await
            .inspect_err(|err| warn!(error = %err, "sync: route fetch failed"))?;

        {
            let _apply = self.apply_lock.lock().await;
            if !self.route_tokens.is_current(token) {
                debug!(token = token.0, "sync: dropping superseded routes");
                return Ok(RefreshOutcome::Superseded);
            }
            let summary = self.routes.refresh(&routes).await;
            info!(
                towns = routes.len(),
                primary = summary.primary,
                alternative = summary.alternative,
                "sync: routes rendered"
            );
        }

        self.refresh_blocked_roads().await
    }

    pub async fn refresh_blocked_roads(&self) -> Result<RefreshOutcome, BackendError> {
        let token = self.blocked_tokens.issue();
        let blocked = self
            .backend
            .fetch_blocked_roads()
            .await
            .inspect_err(|err| warn!(error = %err, "sync: blocked road fetch failed"))?;

        let _apply = self.apply_lock.lock().await;
        if !self.blocked_tokens.is_current(token) {
            debug!(token = token.0, "sync: dropping superseded blocked roads");
            return Ok(RefreshOutcome::Superseded);
        }
        self.markers.refresh(&blocked).await;
        info!(blocked = blocked.len(), "sync: blocked roads rendered");
        *self.blocked.write().await = blocked;
        Ok(RefreshOutcome::Applied)
    }

    pub async fn load_points_of_interest(&self) -> Result<usize, BackendError> {
        let points = self.backend.fetch_points_of_interest().await?;
        let _apply = self.apply_lock.lock().await;
        Ok(self.points.refresh(&points).await)
    }

    /// Resolves a map click to a node and feeds it to the selector, blocking the
    /// edge once a pair completes.
    pub async fn handle_map_click(&self, point: LatLon) -> Result<ClickOutcome, BackendError> {
        let outcome = {
            let mut selector = self.selector.lock().await;
            let node = self
                .backend
                .nearest_node(point)
                .await
                .inspect_err(|err| warn!(error = %err, "sync: nearest node lookup failed"))?;
            let blocked = self.blocked.read().await;
            selector.apply(node, &blocked)
        };
        debug!(?outcome, lat = point.lat, lon = point.lon, "selector: click resolved");

        match outcome {
            SelectionOutcome::FirstNodeSelected(node) => Ok(ClickOutcome::FirstNodeSelected(node)),
            SelectionOutcome::SameNode(node) => Ok(ClickOutcome::SameNodeIgnored(node)),
            SelectionOutcome::AlreadyBlocked(edge) => Ok(ClickOutcome::AlreadyBlocked(edge)),
            SelectionOutcome::EdgeCompleted(edge) => {
                let mutation = self.block_edge(edge).await?;
                Ok(ClickOutcome::BlockRequested(edge, mutation))
            }
        }
    }

    pub async fn block_edge(&self, edge: Edge) -> Result<MutationOutcome, BackendError> {
        if self.blocked.read().await.contains(&edge) {
            return Ok(MutationOutcome::AlreadyBlocked);
        }
        if !self.begin_mutation(edge).await {
            return Ok(MutationOutcome::AlreadyInFlight);
        }
        let result = self.backend.block_road(edge).await;
        self.end_mutation(edge).await;
        result.inspect_err(|err| warn!(error = %err, edge = %edge, "sync: block failed"))?;
        info!(edge = %edge, "sync: road blocked");

        let refresh = if self.refresh_routes_on_block {
            self.refresh_routes().await?
        } else {
            self.refresh_blocked_roads().await?
        };
        Ok(MutationOutcome::Applied(refresh))
    }

    pub async fn unblock_edge(&self, edge: Edge) -> Result<MutationOutcome, BackendError> {
        if !self.begin_mutation(edge).await {
            return Ok(MutationOutcome::AlreadyInFlight);
        }
        let result = self.backend.unblock_road(edge).await;
        self.end_mutation(edge).await;
        result.inspect_err(|err| warn!(error = %err, edge = %edge, "sync: unblock failed"))?;
        info!(edge = %edge, "sync: road unblocked");

        let refresh = self.refresh_routes().await?;
        Ok(MutationOutcome::Applied(refresh))
    }

    pub async fn reset_selection(&self) -> Option<NodeId> {
        self.selector.lock().await.reset()
    }

    pub async fn selection_state(&self) -> SelectionState {
        self.selector.lock().await.state()
    }

    pub async fn blocked_roads(&self) -> BlockedRoadSet {
        self.blocked.read().await.clone()
    }

    pub async fn teardown(&self) {
        let _apply = self.apply_lock.lock().await;
        self.routes.teardown().await;
        self.markers.teardown().await;
        self.points.teardown().await;
        self.selector.lock().await.reset();
        *self.blocked.write().await = BlockedRoadSet::default();
    }

    async fn begin_mutation(&self, edge: Edge) -> bool {
        let inserted = self.in_flight.lock().await.insert(edge);
        if !inserted {
            debug!(edge = %edge, "sync: mutation already in flight");
        }
        inserted
    }

    async fn end_mutation(&self, edge: Edge) {
        self.in_flight.lock().await.remove(&edge);
    }
}

#[cfg(test)]
#[path = "tests/orchestrator_tests.rs"]
mod tests;
