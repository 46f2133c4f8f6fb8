use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{
        BlockedRoad, BlockedRoadSet, Edge, LatLon, Node, NodeId, PointOfInterest, RouteSet,
    },
    error::BackendError,
    protocol::{
        BlockedEndpoint, BlockedRoadsResponse, NearestNodeQuery, NearestNodeResponse, PointsOfInterestResponse,
        RoadMutationRequest, RoutesRequest, BLOCKED_ROADS_PATH, BLOCK_ROAD_PATH,
        NEAREST_NODE_PATH, POINTS_OF_INTEREST_PATH, ROUTES_PATH, UNBLOCK_ROAD_PATH,
    },
};
use tracing::debug;
use url::Url;

use crate::config::ClientSettings;

/// The routing backend, the authority on road-network state.
#[async_trait]
pub trait RoutingBackend: Send + Sync {
    async fn fetch_routes(&self) -> Result<RouteSet, BackendError>;
    async fn fetch_blocked_roads(&self) -> Result<BlockedRoadSet, BackendError>;
    async fn nearest_node(&self, point: LatLon) -> Result<NodeId, BackendError>;
    async fn block_road(&self, edge: Edge) -> Result<(), BackendError>;
    async fn unblock_road(&self, edge: Edge) -> Result<(), BackendError>;
    async fn fetch_points_of_interest(&self) -> Result<Vec<PointOfInterest>, BackendError>;
}

pub struct HttpRoutingBackend {
    http: Client,
    base_url: Url,
}

impl HttpRoutingBackend {
    pub fn new(settings: &ClientSettings) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: settings.backend_base_url()?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &'static str) -> Result<Url, BackendError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| BackendError::network(path, err.to_string()))
    }

    async fn send_mutation(&self, path: &'static str, edge: Edge) -> Result<(), BackendError> {
        let url = self.endpoint(path)?;
        debug!(endpoint = path, edge = %edge, "backend: sending road mutation");
        let res = self
            .http
            .post(url)
            .json(&RoadMutationRequest::from(edge))
            .send()
            .await
            .map_err(|err| BackendError::network(path, err.to_string()))?;
        check_status(path, res)?;
        Ok(())
    }

    /// Endpoints reported without an id are snapped through the nearest-node
    /// lookup, so mutations always carry node ids.
    async fn resolve_endpoint(&self, endpoint: BlockedEndpoint) -> Result<Node, BackendError> {
        match endpoint.into_node() {
            Ok(node) => Ok(node),
            Err(position) => {
                let id = self.nearest_node(position).await?;
                debug!(
                    node = %id,
                    lat = position.lat,
                    lon = position.lon,
                    "backend: resolved blocked endpoint"
                );
                Ok(Node::new(id, position))
            }
        }
    }
}

fn check_status(endpoint: &'static str, res: Response) -> Result<Response, BackendError> {
    let status = res.status();
    if status.is_success() {
        Ok(res)
    } else {
        Err(BackendError::network(
            endpoint,
            format!("unexpected status {status}"),
        ))
    }
}

async fn decode<T: DeserializeOwned>(endpoint: &'static str, res: Response) -> Result<T, BackendError> {
    let res = check_status(endpoint, res)?;
    let body = res
        .bytes()
        .await
        .map_err(|err| BackendError::network(endpoint, err.to_string()))?;
    serde_json::from_slice(&body).map_err(|err| BackendError::malformed(endpoint, err.to_string()))
}

#[async_trait]
impl RoutingBackend for HttpRoutingBackend {
    async fn fetch_routes(&self) -> Result<RouteSet, BackendError> {
        let res = self
            .http
            .post(self.endpoint(ROUTES_PATH)?)
            .json(&RoutesRequest::default())
            .send()
            .await
            .map_err(|err| BackendError::network(ROUTES_PATH, err.to_string()))?;
        decode(ROUTES_PATH, res).await
    }

    async fn fetch_blocked_roads(&self) -> Result<BlockedRoadSet, BackendError> {
        let res = self
            .http
            .get(self.endpoint(BLOCKED_ROADS_PATH)?)
            .send()
            .await
            .map_err(|err| BackendError::network(BLOCKED_ROADS_PATH, err.to_string()))?;
        let body: BlockedRoadsResponse = decode(BLOCKED_ROADS_PATH, res).await?;
        let mut roads = Vec::with_capacity(body.blocked_edges.len());
        for [from, to] in body.blocked_edges {
            let from = self.resolve_endpoint(from).await?;
            let to = self.resolve_endpoint(to).await?;
            roads.push(BlockedRoad::new(from, to));
        }
        Ok(BlockedRoadSet::new(roads))
    }

    async fn nearest_node(&self, point: LatLon) -> Result<NodeId, BackendError> {
        let res = self
            .http
            .get(self.endpoint(NEAREST_NODE_PATH)?)
            .query(&NearestNodeQuery::from(point))
            .send()
            .await
            .map_err(|err| BackendError::network(NEAREST_NODE_PATH, err.to_string()))?;
        let body: NearestNodeResponse = decode(NEAREST_NODE_PATH, res).await?;
        Ok(body.node)
    }

    async fn block_road(&self, edge: Edge) -> Result<(), BackendError> {
        self.send_mutation(BLOCK_ROAD_PATH, edge).await
    }

    async fn unblock_road(&self, edge: Edge) -> Result<(), BackendError> {
        self.send_mutation(UNBLOCK_ROAD_PATH, edge).await
    }

    async fn fetch_points_of_interest(&self) -> Result<Vec<PointOfInterest>, BackendError> {
        let res = self
            .http
            .get(self.endpoint(POINTS_OF_INTEREST_PATH)?)
            .send()
            .await
            .map_err(|err| BackendError::network(POINTS_OF_INTEREST_PATH, err.to_string()))?;
        let body: PointsOfInterestResponse = decode(POINTS_OF_INTEREST_PATH, res).await?;
        Ok(body.into_points())
    }
}

#[cfg(test)]
#[path = "tests/backend_tests.rs"]
mod tests;
