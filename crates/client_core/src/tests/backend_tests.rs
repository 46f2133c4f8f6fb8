use super::*;

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use shared::domain::PoiKind;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct Recorded {
    lookups: Arc<Mutex<Vec<(f64, f64)>>>,
    mutations: Arc<Mutex<Vec<(&'static str, RoadMutationRequest)>>>,
}

async fn spawn_backend(app: Router) -> Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

fn client_for(url: String) -> HttpRoutingBackend {
    let settings = ClientSettings {
        backend_url: url,
        ..ClientSettings::default()
    };
    HttpRoutingBackend::new(&settings).expect("client")
}

async fn nearest(
    State(recorded): State<Recorded>,
    Query(query): Query<NearestNodeQuery>,
) -> Json<Value> {
    recorded.lookups.lock().await.push((query.lat, query.lon));
    Json(json!({ "node": 4242 }))
}

async fn block(
    State(recorded): State<Recorded>,
    Json(body): Json<RoadMutationRequest>,
) -> Json<Value> {
    recorded.mutations.lock().await.push((BLOCK_ROAD_PATH, body));
    Json(json!({ "status": "success" }))
}

async fn unblock(
    State(recorded): State<Recorded>,
    Json(body): Json<RoadMutationRequest>,
) -> Json<Value> {
    recorded.mutations.lock().await.push((UNBLOCK_ROAD_PATH, body));
    Json(json!({ "status": "success" }))
}

fn recording_router(recorded: Recorded) -> Router {
    Router::new()
        .route(NEAREST_NODE_PATH, get(nearest))
        .route(BLOCK_ROAD_PATH, post(block))
        .route(UNBLOCK_ROAD_PATH, post(unblock))
        .with_state(recorded)
}

#[tokio::test]
async fn nearest_node_sends_click_as_query() {
    let recorded = Recorded::default();
    let url = spawn_backend(recording_router(recorded.clone()))
        .await
        .expect("spawn backend");
    let backend = client_for(url);

    let node = backend
        .nearest_node(LatLon::new(-1.2921, 36.8219))
        .await
        .expect("lookup");

    assert_eq!(node, NodeId(4242));
    assert_eq!(*recorded.lookups.lock().await, vec![(-1.2921, 36.8219)]);
}

#[tokio::test]
async fn mutations_post_nodes_in_edge_order() {
    let recorded = Recorded::default();
    let url = spawn_backend(recording_router(recorded.clone()))
        .await
        .expect("spawn backend");
    let backend = client_for(url);

    backend
        .block_road(Edge::new(NodeId(10), NodeId(11)))
        .await
        .expect("block");
    backend
        .unblock_road(Edge::new(NodeId(11), NodeId(10)))
        .await
        .expect("unblock");

    let mutations = recorded.mutations.lock().await;
    assert_eq!(
        *mutations,
        vec![
            (
                BLOCK_ROAD_PATH,
                RoadMutationRequest {
                    node1: NodeId(10),
                    node2: NodeId(11)
                }
            ),
            (
                UNBLOCK_ROAD_PATH,
                RoadMutationRequest {
                    node1: NodeId(11),
                    node2: NodeId(10)
                }
            ),
        ]
    );
}

#[tokio::test]
async fn blocked_roads_and_routes_decode() {
    let app = Router::new()
        .route(
            ROUTES_PATH,
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body, json!({}));
                Json(json!({
                    "Westlands": {
                        "primary": [[-1.28, 36.81], [-1.27, 36.80]],
                        "alternative": []
                    }
                }))
            }),
        )
        .route(
            BLOCKED_ROADS_PATH,
            get(|| async {
                Json(json!({
                    "blocked_edges": [[
                        { "node": 10, "lat": -1.28, "lon": 36.81 },
                        { "node": 11, "lat": -1.29, "lon": 36.82 }
                    ]]
                }))
            }),
        );
    let backend = client_for(spawn_backend(app).await.expect("spawn backend"));

    let routes = backend.fetch_routes().await.expect("routes");
    assert_eq!(routes["Westlands"].primary.len(), 2);
    assert!(routes["Westlands"].alternative.is_empty());

    let blocked = backend.fetch_blocked_roads().await.expect("blocked");
    assert_eq!(blocked.len(), 1);
    let road = blocked
        .get(&Edge::new(NodeId(11), NodeId(10)))
        .expect("blocked edge");
    assert_eq!(road.from.id, NodeId(10));
    assert_eq!(road.anchor(), Some(LatLon::new(-1.28, 36.81)));
}

async fn snap_to_node(Query(query): Query<NearestNodeQuery>) -> Json<Value> {
    let node = if query.lat > -1.2865 { 10 } else { 11 };
    Json(json!({ "node": node }))
}

#[tokio::test]
async fn blocked_endpoints_without_ids_are_resolved_by_position() {
    let app = Router::new()
        .route(NEAREST_NODE_PATH, get(snap_to_node))
        .route(
            BLOCKED_ROADS_PATH,
            get(|| async {
                Json(json!({
                    "blocked_edges": [[
                        { "lat": -1.286, "lon": 36.817 },
                        { "lat": -1.287, "lon": 36.818 }
                    ]]
                }))
            }),
        );
    let backend = client_for(spawn_backend(app).await.expect("spawn backend"));

    let blocked = backend.fetch_blocked_roads().await.expect("blocked");

    let road = blocked
        .get(&Edge::new(NodeId(10), NodeId(11)))
        .expect("resolved edge");
    assert_eq!((road.edge.node1, road.edge.node2), (NodeId(10), NodeId(11)));
    assert_eq!(road.anchor(), Some(LatLon::new(-1.286, 36.817)));
}

#[tokio::test]
async fn blocked_endpoints_as_bare_ids_keep_membership_without_position() {
    let app = Router::new().route(
        BLOCKED_ROADS_PATH,
        get(|| async { Json(json!({ "blocked_edges": [[10, 11]] })) }),
    );
    let backend = client_for(spawn_backend(app).await.expect("spawn backend"));

    let blocked = backend.fetch_blocked_roads().await.expect("blocked");

    assert!(blocked.contains(&Edge::new(NodeId(11), NodeId(10))));
    let road = blocked
        .get(&Edge::new(NodeId(10), NodeId(11)))
        .expect("edge");
    assert_eq!(road.anchor(), None);
}

#[tokio::test]
async fn failed_endpoint_resolution_fails_the_fetch() {
    let app = Router::new()
        .route(
            NEAREST_NODE_PATH,
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        )
        .route(
            BLOCKED_ROADS_PATH,
            get(|| async {
                Json(json!({ "blocked_edges": [[{ "lat": 0.0, "lon": 0.0 }, 11]] }))
            }),
        );
    let backend = client_for(spawn_backend(app).await.expect("spawn backend"));

    let err = backend
        .fetch_blocked_roads()
        .await
        .expect_err("lookup should fail");

    assert_eq!(err.endpoint(), NEAREST_NODE_PATH);
}

#[tokio::test]
async fn points_of_interest_ignore_road_geometry() {
    let app = Router::new().route(
        POINTS_OF_INTEREST_PATH,
        get(|| async {
            Json(json!({
                "roads": { "type": "FeatureCollection", "features": [] },
                "hospitals": [{ "name": "Kenyatta National Hospital", "lat": -1.30, "lng": 36.80 }],
                "schools": [{ "name": "Moi Girls", "lat": -1.31, "lng": 36.79 }]
            }))
        }),
    );
    let backend = client_for(spawn_backend(app).await.expect("spawn backend"));

    let points = backend.fetch_points_of_interest().await.expect("points");

    let kinds: Vec<PoiKind> = points.iter().map(|point| point.kind).collect();
    assert_eq!(kinds, vec![PoiKind::Hospital, PoiKind::School]);
    assert_eq!(points[0].position, LatLon::new(-1.30, 36.80));
}

#[tokio::test]
async fn server_error_is_network_failure() {
    let app = Router::new().route(
        BLOCKED_ROADS_PATH,
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let backend = client_for(spawn_backend(app).await.expect("spawn backend"));

    let err = backend
        .fetch_blocked_roads()
        .await
        .expect_err("500 should fail");

    assert!(!err.is_malformed());
    assert_eq!(err.endpoint(), BLOCKED_ROADS_PATH);
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn unexpected_body_is_malformed_response() {
    let app = Router::new()
        .route(NEAREST_NODE_PATH, get(|| async { Json(json!({ "id": 3 })) }))
        .route(ROUTES_PATH, post(|| async { "<html>not json</html>" }));
    let backend = client_for(spawn_backend(app).await.expect("spawn backend"));

    let lookup = backend
        .nearest_node(LatLon::new(0.0, 0.0))
        .await
        .expect_err("missing node");
    assert!(lookup.is_malformed());
    assert_eq!(lookup.endpoint(), NEAREST_NODE_PATH);

    let routes = backend.fetch_routes().await.expect_err("not json");
    assert!(routes.is_malformed());
}

#[tokio::test]
async fn unreachable_backend_is_network_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let backend = client_for(format!("http://{addr}"));

    let err = backend.fetch_routes().await.expect_err("nothing listening");

    assert!(matches!(
        err,
        BackendError::NetworkFailure {
            endpoint: ROUTES_PATH,
            ..
        }
    ));
}

#[tokio::test]
async fn base_path_prefix_is_kept() {
    let app = Router::new().route(
        "/map/api/blocked_roads",
        get(|| async { Json(json!({ "blocked_edges": [] })) }),
    );
    let url = spawn_backend(app).await.expect("spawn backend");
    let backend = client_for(format!("{url}/map"));

    assert_eq!(backend.base_url().path(), "/map/");
    let blocked = backend.fetch_blocked_roads().await.expect("blocked");
    assert!(blocked.is_empty());
}
