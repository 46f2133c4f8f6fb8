use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use shared::{
    domain::{
        BlockedRoad, BlockedRoadSet, Edge, LatLon, Node, NodeId, PoiKind, PointOfInterest,
        RouteSet, TownRoutes,
    },
    error::BackendError,
    protocol::{
        BLOCKED_ROADS_PATH, BLOCK_ROAD_PATH, NEAREST_NODE_PATH, POINTS_OF_INTEREST_PATH,
        ROUTES_PATH, UNBLOCK_ROAD_PATH,
    },
};
use tokio::sync::Mutex;

use crate::backend::RoutingBackend;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Call {
    Routes,
    BlockedRoads,
    NearestNode(LatLon),
    Block(Edge),
    Unblock(Edge),
    PointsOfInterest,
}

/// In-memory backend: keeps its own blocked set and serves `routes_when_blocked`
/// while anything is blocked.
#[derive(Default)]
pub(crate) struct FakeBackend {
    pub nodes: Mutex<Vec<(LatLon, NodeId)>>,
    pub positions: Mutex<HashMap<NodeId, LatLon>>,
    pub blocked: Mutex<Vec<BlockedRoad>>,
    pub routes_open: Mutex<RouteSet>,
    pub routes_when_blocked: Mutex<Option<RouteSet>>,
    pub scripted_routes: Mutex<VecDeque<(Duration, RouteSet)>>,
    pub scripted_blocked: Mutex<VecDeque<(Duration, Vec<BlockedRoad>)>>,
    pub lookup_delays: Mutex<VecDeque<Duration>>,
    pub mutation_delay: Mutex<Option<Duration>>,
    pub failing: Mutex<HashSet<&'static str>>,
    pub calls: Mutex<Vec<Call>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn with_node(&self, point: LatLon, id: i64) {
        self.nodes.lock().await.push((point, NodeId(id)));
        self.positions.lock().await.insert(NodeId(id), point);
    }

    pub async fn fail(&self, endpoint: &'static str) {
        self.failing.lock().await.insert(endpoint);
    }

    pub async fn recover(&self, endpoint: &'static str) {
        self.failing.lock().await.remove(endpoint);
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    pub async fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().await.iter().filter(|call| matches(*call)).count()
    }

    pub async fn node_road(&self, a: i64, b: i64) -> BlockedRoad {
        let positions = self.positions.lock().await;
        let node = |id: i64| {
            let at = positions
                .get(&NodeId(id))
                .copied()
                .unwrap_or(LatLon::new(0.0, 0.0));
            Node::new(NodeId(id), at)
        };
        BlockedRoad::new(node(a), node(b))
    }

    async fn mutation_pause(&self) {
        let delay = *self.mutation_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    async fn record(&self, endpoint: &'static str, call: Call) -> Result<(), BackendError> {
        self.calls.lock().await.push(call);
        if self.failing.lock().await.contains(endpoint) {
            return Err(BackendError::network(endpoint, "unexpected status 500"));
        }
        Ok(())
    }
}

pub(crate) fn single_town(town: &str, primary: Vec<LatLon>) -> RouteSet {
    let mut routes = RouteSet::new();
    routes.insert(
        town.to_string(),
        TownRoutes {
            primary,
            alternative: Vec::new(),
        },
    );
    routes
}

#[async_trait]
impl RoutingBackend for FakeBackend {
    async fn fetch_routes(&self) -> Result<RouteSet, BackendError> {
        self.record(ROUTES_PATH, Call::Routes).await?;
        let scripted = self.scripted_routes.lock().await.pop_front();
        if let Some((delay, routes)) = scripted {
            tokio::time::sleep(delay).await;
            return Ok(routes);
        }
        if !self.blocked.lock().await.is_empty() {
            if let Some(routes) = self.routes_when_blocked.lock().await.clone() {
                return Ok(routes);
            }
        }
        Ok(self.routes_open.lock().await.clone())
    }

    async fn fetch_blocked_roads(&self) -> Result<BlockedRoadSet, BackendError> {
        self.record(BLOCKED_ROADS_PATH, Call::BlockedRoads).await?;
        let scripted = self.scripted_blocked.lock().await.pop_front();
        if let Some((delay, roads)) = scripted {
            tokio::time::sleep(delay).await;
            return Ok(BlockedRoadSet::new(roads));
        }
        Ok(BlockedRoadSet::new(self.blocked.lock().await.clone()))
    }

    async fn nearest_node(&self, point: LatLon) -> Result<NodeId, BackendError> {
        self.record(NEAREST_NODE_PATH, Call::NearestNode(point)).await?;
        let delay = self.lookup_delays.lock().await.pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.nodes
            .lock()
            .await
            .iter()
            .find(|(at, _)| *at == point)
            .map(|(_, id)| *id)
            .ok_or_else(|| BackendError::malformed(NEAREST_NODE_PATH, "missing field `node`"))
    }

    async fn block_road(&self, edge: Edge) -> Result<(), BackendError> {
        self.record(BLOCK_ROAD_PATH, Call::Block(edge)).await?;
        self.mutation_pause().await;
        let road = self.node_road(edge.node1.0, edge.node2.0).await;
        let mut blocked = self.blocked.lock().await;
        if !blocked.iter().any(|existing| existing.edge == edge) {
            blocked.push(road);
        }
        Ok(())
    }

    async fn unblock_road(&self, edge: Edge) -> Result<(), BackendError> {
        self.record(UNBLOCK_ROAD_PATH, Call::Unblock(edge)).await?;
        self.mutation_pause().await;
        self.blocked.lock().await.retain(|road| road.edge != edge);
        Ok(())
    }

    async fn fetch_points_of_interest(&self) -> Result<Vec<PointOfInterest>, BackendError> {
        self.record(POINTS_OF_INTEREST_PATH, Call::PointsOfInterest)
            .await?;
        Ok(vec![PointOfInterest {
            kind: PoiKind::Hospital,
            name: "Kenyatta National Hospital".to_string(),
            position: LatLon::new(-1.300355, 36.806681),
        }])
    }
}
