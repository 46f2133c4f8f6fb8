use client_core::{
    surface::{FadePhase, LayerCategory, MarkerAction, MarkerIcon, SceneLayer},
    ClickOutcome, MutationOutcome, RefreshOutcome, SceneSurface, SessionOutcome,
};
use serde_json::{json, Value};
use shared::domain::{LatLon, PoiKind};

pub fn describe_outcome(outcome: &SessionOutcome) -> String {
    match outcome {
        SessionOutcome::Click(ClickOutcome::FirstNodeSelected(node)) => {
            format!("selected node {node}, click a second point to block the road")
        }
        SessionOutcome::Click(ClickOutcome::SameNodeIgnored(node)) => {
            format!("node {node} clicked twice, selection cleared")
        }
        SessionOutcome::Click(ClickOutcome::AlreadyBlocked(edge)) => {
            format!("road {edge} is already blocked")
        }
        SessionOutcome::Click(ClickOutcome::BlockRequested(edge, mutation)) => {
            format!("block {edge}: {}", describe_mutation(mutation))
        }
        SessionOutcome::Unblock(mutation) => format!("unblock: {}", describe_mutation(mutation)),
        SessionOutcome::SelectionCancelled(Some(node)) => format!("selection of node {node} cancelled"),
        SessionOutcome::SelectionCancelled(None) => "nothing selected".to_string(),
        SessionOutcome::Reloaded(refresh) => format!("reload {}", describe_refresh(refresh)),
        SessionOutcome::Ignored => "nothing to do for that marker".to_string(),
        SessionOutcome::Failed(err) => format!("error: {err}"),
    }
}

fn describe_mutation(mutation: &MutationOutcome) -> String {
    match mutation {
        MutationOutcome::Applied(refresh) => format!("done, view {}", describe_refresh(refresh)),
        MutationOutcome::AlreadyBlocked => "already blocked".to_string(),
        MutationOutcome::AlreadyInFlight => "request already in flight".to_string(),
    }
}

fn describe_refresh(refresh: &RefreshOutcome) -> &'static str {
    match refresh {
        RefreshOutcome::Applied => "updated",
        RefreshOutcome::Superseded => "superseded by a newer refresh",
    }
}

/// One line per layer, in creation order.
pub fn describe_scene(scene: &SceneSurface) -> String {
    let mut out = String::new();
    for (id, layer) in scene.layers() {
        let line = match layer {
            SceneLayer::Polyline(line) => format!(
                "[{id}] {} ({} points, {} weight {}{})\n",
                line.label,
                line.points.len(),
                line.style.color,
                line.style.weight,
                line.style
                    .dash_array
                    .map(|dash| format!(", dash {dash}"))
                    .unwrap_or_default()
            ),
            SceneLayer::Marker(marker) => format!(
                "[{id}] {} at {:.6}, {:.6}{}{}\n",
                marker.label,
                marker.position.lat,
                marker.position.lon,
                match marker.phase {
                    Some(FadePhase::FadingOut) => " (fading out)",
                    _ => "",
                },
                if scene.open_popup_layer() == Some(id) {
                    " [popup]"
                } else {
                    ""
                }
            ),
        };
        out.push_str(&line);
    }
    if out.is_empty() {
        out.push_str("(empty scene)\n");
    }
    out
}

fn coordinates(point: &LatLon) -> Value {
    json!([point.lon, point.lat])
}

fn category_name(category: LayerCategory) -> &'static str {
    match category {
        LayerCategory::Route => "route",
        LayerCategory::BlockedRoad => "blocked_road",
        LayerCategory::PointOfInterest => "point_of_interest",
    }
}

/// GeoJSON `FeatureCollection` of the scene. Positions are written `[lon, lat]`.
pub fn scene_geojson(scene: &SceneSurface) -> Value {
    let features: Vec<Value> = scene
        .layers()
        .map(|(id, layer)| match layer {
            SceneLayer::Polyline(line) => json!({
                "type": "Feature",
                "id": id.0,
                "geometry": {
                    "type": "LineString",
                    "coordinates": line.points.iter().map(coordinates).collect::<Vec<_>>(),
                },
                "properties": {
                    "category": category_name(line.category),
                    "label": line.label,
                    "color": line.style.color,
                    "weight": line.style.weight,
                    "dash_array": line.style.dash_array,
                },
            }),
            SceneLayer::Marker(marker) => {
                let icon = match marker.icon {
                    MarkerIcon::Roadblock => "roadblock",
                    MarkerIcon::Poi(PoiKind::WaterPoint) => "water_point",
                    MarkerIcon::Poi(PoiKind::Hospital) => "hospital",
                    MarkerIcon::Poi(PoiKind::School) => "school",
                };
                let edge = marker.on_click.map(|MarkerAction::UnblockOnClick { edge }| {
                    json!({ "node1": edge.node1, "node2": edge.node2 })
                });
                json!({
                    "type": "Feature",
                    "id": id.0,
                    "geometry": {
                        "type": "Point",
                        "coordinates": coordinates(&marker.position),
                    },
                    "properties": {
                        "category": category_name(marker.category),
                        "label": marker.label,
                        "icon": icon,
                        "edge": edge,
                    },
                })
            }
        })
        .collect();

    json!({ "type": "FeatureCollection", "features": features })
}
