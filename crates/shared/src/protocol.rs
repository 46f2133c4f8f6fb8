use serde::{Deserialize, Serialize};

use crate::domain::{Edge, LatLon, Node, NodeId, PoiKind, PointOfInterest, RouteSet};

pub const ROUTES_PATH: &str = "/api/routes";
pub const BLOCKED_ROADS_PATH: &str = "/api/blocked_roads";
pub const NEAREST_NODE_PATH: &str = "/api/nearest_node";
pub const BLOCK_ROAD_PATH: &str = "/api/block_road";
pub const UNBLOCK_ROAD_PATH: &str = "/api/unblock_road";
pub const POINTS_OF_INTEREST_PATH: &str = "/data";

/// Body of `POST /api/routes`; the backend takes no parameters, so this is `{}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutesRequest {}

pub type RoutesResponse = RouteSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedRoadsResponse {
    pub blocked_edges: Vec<[BlockedEndpoint; 2]>,
}

/// One end of a blocked edge: `{"node", "lat", "lon"}`, `{"lat", "lon"}`, or a
/// bare node id.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockedEndpoint {
    Id(NodeId),
    Located {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node: Option<NodeId>,
        lat: f64,
        lon: f64,
    },
}

impl BlockedEndpoint {
    /// The node, when the backend named it. `Err` carries the position whose
    /// node id still has to be looked up.
    pub fn into_node(self) -> Result<Node, LatLon> {
        match self {
            Self::Id(id) => Ok(Node::unplaced(id)),
            Self::Located {
                node: Some(id),
                lat,
                lon,
            } => Ok(Node::new(id, LatLon::new(lat, lon))),
            Self::Located {
                node: None,
                lat,
                lon,
            } => Err(LatLon::new(lat, lon)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NearestNodeQuery {
    pub lat: f64,
    pub lon: f64,
}

impl From<LatLon> for NearestNodeQuery {
    fn from(value: LatLon) -> Self {
        Self {
            lat: value.lat,
            lon: value.lon,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NearestNodeResponse {
    pub node: NodeId,
}

/// Body shared by `POST /api/block_road` and `POST /api/unblock_road`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadMutationRequest {
    pub node1: NodeId,
    pub node2: NodeId,
}

impl From<Edge> for RoadMutationRequest {
    fn from(edge: Edge) -> Self {
        Self {
            node1: edge.node1,
            node2: edge.node2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoiEntry {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

/// `GET /data`. The backend also ships a road GeoJSON blob there, which the
/// client has no use for and leaves undeclared.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointsOfInterestResponse {
    #[serde(default)]
    pub water_points: Vec<PoiEntry>,
    #[serde(default)]
    pub hospitals: Vec<PoiEntry>,
    #[serde(default)]
    pub schools: Vec<PoiEntry>,
}

impl PointsOfInterestResponse {
    pub fn into_points(self) -> Vec<PointOfInterest> {
        let tag = |kind: PoiKind| {
            move |entry: PoiEntry| PointOfInterest {
                kind,
                name: entry.name,
                position: LatLon::new(entry.lat, entry.lng),
            }
        };
        self.water_points
            .into_iter()
            .map(tag(PoiKind::WaterPoint))
            .chain(self.hospitals.into_iter().map(tag(PoiKind::Hospital)))
            .chain(self.schools.into_iter().map(tag(PoiKind::School)))
            .collect()
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
