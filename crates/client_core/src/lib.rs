pub mod backend;
pub mod config;
pub mod markers;
pub mod orchestrator;
pub mod poi_layers;
pub mod route_layers;
pub mod selector;
pub mod session;
pub mod surface;

pub use backend::{HttpRoutingBackend, RoutingBackend};
pub use config::{load_settings, ClientSettings};
pub use orchestrator::{ClickOutcome, MutationOutcome, RefreshOutcome, SyncOrchestrator};
pub use session::{MapEvent, MapSessionController, SessionOutcome};
pub use surface::{MapSurface, SceneSurface, SharedSurface};

#[cfg(test)]
#[path = "tests/fake_backend.rs"]
pub(crate) mod fake_backend;
