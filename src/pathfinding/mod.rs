mod types;
mod astar;
mod sector;
mod sector_flow;
mod graph;
mod graph_build;
mod portal_astar;
mod query;
mod systems;

#[cfg(test)]
mod tests;

// ============================================================================
// PUBLIC API
// ============================================================================

pub use types::{
    AutopilotPath, PathRequest, PathSearchResult, Portal, PortalConnection, PortalHighlight, SectorCoord,
    SECTOR_SIZE, UNREACHABLE,
};
pub use astar::{find_path_astar_local, path_steps};
pub use sector::Sector;
pub use sector_flow::{generate_sector_flow_field, SectorFlowField};
pub use graph::{GraphStats, PortalGraph, PortalNetwork};
pub use graph_build::prebuild;
pub use portal_astar::find_portal_path;
pub use query::{find_path, Navigator, PathFinder, QueryOverlay, QueryView};
pub use systems::follow_autopilot;

use bevy::prelude::*;
use crate::config::NavConfig;

pub struct PathfindingPlugin;

impl Plugin for PathfindingPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<PathRequest>();
        app.init_resource::<NavConfig>();
        app.init_resource::<PortalGraph>();
        app.init_resource::<PortalHighlight>();
        app.add_systems(
            Update,
            (
                systems::rebuild_portal_graph,
                systems::process_path_requests,
                systems::follow_autopilot,
            )
                .chain(),
        );
    }
}
