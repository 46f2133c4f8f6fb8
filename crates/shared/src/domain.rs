use std::{
    collections::{BTreeMap, HashSet},
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(NodeId);

/// Geographic point in degrees. Travels as a `[lat, lon]` pair on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Chebyshev distance in degrees, good enough for hit testing at city scale.
    pub fn max_delta(&self, other: &LatLon) -> f64 {
        (self.lat - other.lat).abs().max((self.lon - other.lon).abs())
    }
}

impl From<[f64; 2]> for LatLon {
    fn from([lat, lon]: [f64; 2]) -> Self {
        Self { lat, lon }
    }
}

impl From<LatLon> for [f64; 2] {
    fn from(value: LatLon) -> Self {
        [value.lat, value.lon]
    }
}

/// Graph node as the backend reported it. Blocked edges listed as bare id
/// pairs carry no position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub position: Option<LatLon>,
}

impl Node {
    pub fn new(id: NodeId, position: LatLon) -> Self {
        Self {
            id,
            position: Some(position),
        }
    }

    pub fn unplaced(id: NodeId) -> Self {
        Self { id, position: None }
    }
}

/// Road segment between two graph nodes.
///
/// Equality and hashing ignore orientation: `Edge::new(a, b) == Edge::new(b, a)`.
/// The construction order is kept because it is what goes out as
/// `node1`/`node2` in block and unblock requests.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Edge {
    pub node1: NodeId,
    pub node2: NodeId,
}

impl Edge {
    pub fn new(node1: NodeId, node2: NodeId) -> Self {
        Self { node1, node2 }
    }

    pub fn is_loop(&self) -> bool {
        self.node1 == self.node2
    }

    fn key(&self) -> (NodeId, NodeId) {
        if self.node1 <= self.node2 {
            (self.node1, self.node2)
        } else {
            (self.node2, self.node1)
        }
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Edge {}

impl Hash for Edge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.node1, self.node2)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TownRoutes {
    pub primary: Vec<LatLon>,
    pub alternative: Vec<LatLon>,
}

impl TownRoutes {
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.alternative.is_empty()
    }
}

/// Routes keyed by destination town, sorted so rendering order is stable.
pub type RouteSet = BTreeMap<String, TownRoutes>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockedRoad {
    pub edge: Edge,
    pub from: Node,
    pub to: Node,
}

impl BlockedRoad {
    pub fn new(from: Node, to: Node) -> Self {
        Self {
            edge: Edge::new(from.id, to.id),
            from,
            to,
        }
    }

    /// Markers sit on the first endpoint reported by the backend, or on the
    /// second when only that one has a position.
    pub fn anchor(&self) -> Option<LatLon> {
        self.from.position.or(self.to.position)
    }
}

/// Blocked roads as last reported by the backend, unique by unordered edge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockedRoadSet {
    roads: Vec<BlockedRoad>,
}

impl BlockedRoadSet {
    pub fn new(roads: impl IntoIterator<Item = BlockedRoad>) -> Self {
        let mut seen = HashSet::new();
        let roads = roads
            .into_iter()
            .filter(|road| seen.insert(road.edge))
            .collect();
        Self { roads }
    }

    pub fn contains(&self, edge: &Edge) -> bool {
        self.roads.iter().any(|road| road.edge == *edge)
    }

    pub fn get(&self, edge: &Edge) -> Option<&BlockedRoad> {
        self.roads.iter().find(|road| road.edge == *edge)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockedRoad> {
        self.roads.iter()
    }

    pub fn edges(&self) -> HashSet<Edge> {
        self.roads.iter().map(|road| road.edge).collect()
    }

    pub fn len(&self) -> usize {
        self.roads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roads.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoiKind {
    WaterPoint,
    Hospital,
    School,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointOfInterest {
    pub kind: PoiKind,
    pub name: String,
    pub position: LatLon,
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
