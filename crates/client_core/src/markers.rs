use std::{collections::HashMap, sync::Arc, time::Duration};

use shared::domain::{BlockedRoad, BlockedRoadSet, Edge, LatLon};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::debug;

use crate::surface::{
    FadePhase, LayerCategory, LayerId, MapSurface, Marker, MarkerAction, MarkerIcon,
    SharedSurface,
};

pub const BLOCKED_ROAD_LABEL: &str = "Blocked Road - Click to Unblock";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkerDelta {
    pub added: usize,
    pub retired: usize,
    pub revived: usize,
    pub replaced: usize,
    /// Blocked edges reported without any endpoint position.
    pub unplaced: usize,
}

#[derive(Default)]
struct MarkerBook {
    displayed: HashMap<Edge, (LayerId, BlockedRoad)>,
    // Fading out, still on the surface until the scheduled removal runs.
    // Keyed with the retirement generation that scheduled the removal.
    retiring: HashMap<LayerId, (BlockedRoad, u64)>,
    retirements: u64,
    removals: Vec<JoinHandle<()>>,
}

/// Markers for blocked edges, with fade-in on creation and fade-out before removal.
///
/// Lock order is always book, then surface.
pub struct BlockedRoadMarkerManager {
    surface: SharedSurface,
    fade_duration: Duration,
    book: Mutex<MarkerBook>,
}

impl BlockedRoadMarkerManager {
    pub fn new(surface: SharedSurface, fade_duration: Duration) -> Arc<Self> {
        Arc::new(Self {
            surface,
            fade_duration,
            book: Mutex::new(MarkerBook::default()),
        })
    }

    pub async fn refresh(self: &Arc<Self>, blocked: &BlockedRoadSet) -> MarkerDelta {
        let mut book = self.book.lock().await;
        let mut surface = self.surface.lock().await;
        let mut delta = MarkerDelta::default();
        book.removals.retain(|handle| !handle.is_finished());

        let current = blocked.edges();
        let gone: Vec<Edge> = book
            .displayed
            .keys()
            .filter(|edge| !current.contains(edge))
            .copied()
            .collect();
        for edge in gone {
            if let Some((layer, road)) = book.displayed.remove(&edge) {
                self.retire(&mut book, &mut *surface, layer, road);
                delta.retired += 1;
            }
        }

        for road in blocked.iter() {
            // Without a position there is nothing to draw; a marker the edge
            // already has is kept.
            let Some(anchor) = road.anchor() else {
                delta.unplaced += 1;
                continue;
            };
            if let Some((layer, shown)) = book.displayed.get(&road.edge).copied() {
                if shown == *road {
                    continue;
                }
                // Same edge reported with different endpoints; the click action
                // must carry what the backend reports now.
                surface.remove_layer(layer);
                let layer = surface.add_marker(blocked_road_marker(road, anchor));
                book.displayed.insert(road.edge, (layer, *road));
                delta.replaced += 1;
                continue;
            }

            let fading = book
                .retiring
                .iter()
                .find(|(_, (retired, _))| retired.edge == road.edge)
                .map(|(layer, (retired, _))| (*layer, *retired));
            if let Some((layer, retired)) = fading {
                book.retiring.remove(&layer);
                if retired == *road {
                    surface.set_fade_phase(layer, FadePhase::FadingIn);
                    book.displayed.insert(road.edge, (layer, *road));
                    delta.revived += 1;
                    continue;
                }
                surface.remove_layer(layer);
            }

            let layer = surface.add_marker(blocked_road_marker(road, anchor));
            book.displayed.insert(road.edge, (layer, *road));
            delta.added += 1;
        }

        debug!(
            added = delta.added,
            retired = delta.retired,
            revived = delta.revived,
            replaced = delta.replaced,
            unplaced = delta.unplaced,
            "markers: refreshed blocked road markers"
        );
        delta
    }

    pub async fn displayed_edges(&self) -> Vec<Edge> {
        self.book.lock().await.displayed.keys().copied().collect()
    }

    pub async fn layer_for(&self, edge: &Edge) -> Option<LayerId> {
        self.book
            .lock()
            .await
            .displayed
            .get(edge)
            .map(|(layer, _)| *layer)
    }

    pub async fn teardown(&self) {
        let mut book = self.book.lock().await;
        let mut surface = self.surface.lock().await;
        for handle in book.removals.drain(..) {
            handle.abort();
        }
        for (_, (layer, _)) in book.displayed.drain() {
            surface.remove_layer(layer);
        }
        for (layer, _) in book.retiring.drain() {
            surface.remove_layer(layer);
        }
    }

    fn retire(
        self: &Arc<Self>,
        book: &mut MarkerBook,
        surface: &mut dyn MapSurface,
        layer: LayerId,
        road: BlockedRoad,
    ) {
        surface.set_fade_phase(layer, FadePhase::FadingOut);
        book.retirements += 1;
        let generation = book.retirements;
        book.retiring.insert(layer, (road, generation));

        let manager = Arc::clone(self);
        let delay = self.fade_duration;
        book.removals.push(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            manager.finish_removal(layer, generation).await;
        }));
    }

    /// Runs once per retirement. A no-op if the marker was revived or torn down
    /// meanwhile, or retired again by a later refresh whose own timer owns it.
    async fn finish_removal(&self, layer: LayerId, generation: u64) -> bool {
        let mut book = self.book.lock().await;
        let owned = book
            .retiring
            .get(&layer)
            .is_some_and(|(_, current)| *current == generation);
        if !owned {
            debug!(layer = layer.0, generation, "markers: removal skipped, marker no longer retiring");
            return false;
        }
        book.retiring.remove(&layer);
        self.surface.lock().await.remove_layer(layer)
    }
}

fn blocked_road_marker(road: &BlockedRoad, anchor: LatLon) -> Marker {
    Marker {
        category: LayerCategory::BlockedRoad,
        position: anchor,
        icon: MarkerIcon::Roadblock,
        label: BLOCKED_ROAD_LABEL.to_string(),
        phase: Some(FadePhase::FadingIn),
        on_click: Some(MarkerAction::UnblockOnClick { edge: road.edge }),
    }
}

#[cfg(test)]
#[path = "tests/markers_tests.rs"]
mod tests;
