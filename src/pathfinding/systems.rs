use bevy::prelude::*;
use crate::config::NavConfig;
use crate::map::load_or_build_graph;
use crate::structures::DungeonGrid;
use super::graph::PortalGraph;
use super::query::{Navigator, PathFinder};
use super::types::{AutopilotPath, PathRequest, PortalHighlight};

/// Rebuild the portal graph whenever the grid resource is added or replaced,
/// or the configured sector size no longer matches.
pub(super) fn rebuild_portal_graph(
    grid: Option<Res<DungeonGrid>>,
    mut graph: ResMut<PortalGraph>,
    config: Res<NavConfig>,
) {
    let Some(grid) = grid else {
        return;
    };
    let sector_size = config.sector_size.max(1);
    if graph.initialized && !grid.is_changed() && graph.sector_size == sector_size {
        return;
    }

    let start_time = std::time::Instant::now();
    *graph = match &config.graph_cache_path {
        Some(path) => load_or_build_graph(path, &grid, sector_size),
        None => PortalGraph::build(&grid, sector_size),
    };

    let duration = start_time.elapsed();
    if duration.as_millis() > config.slow_build_warn_ms as u128 {
        warn!(
            "[PATHFINDING] Slow graph rebuild: {:?} for {}x{} grid",
            duration,
            grid.width(),
            grid.height()
        );
    }
}

pub(super) fn process_path_requests(
    mut path_requests: MessageReader<PathRequest>,
    mut commands: Commands,
    grid: Option<Res<DungeonGrid>>,
    graph: Res<PortalGraph>,
    config: Res<NavConfig>,
    mut highlight: ResMut<PortalHighlight>,
) {
    if path_requests.is_empty() {
        return;
    }

    let start_time = std::time::Instant::now();
    let request_count = path_requests.len();

    if request_count > config.max_pending_requests {
        warn!("[PATHFINDING] High path request count: {} pending requests!", request_count);
    }

    let Some(grid) = grid else {
        warn!("[PATHFINDING] No dungeon grid loaded, dropping {} requests", request_count);
        path_requests.clear();
        return;
    };
    if !graph.initialized {
        warn!("Graph not initialized");
        path_requests.clear();
        return;
    }

    let navigator = Navigator::new(&grid, &graph);

    for request in path_requests.read() {
        let Some(goal_tile) = grid.tile_at(request.goal) else {
            warn!(
                "Goal position {:?} is OUT OF BOUNDS! Grid is {}x{}",
                request.goal,
                grid.width(),
                grid.height()
            );
            continue;
        };
        if !grid.is_walkable(goal_tile) {
            warn!("Goal {:?} is a wall, ignoring request for {:?}", goal_tile, request.entity);
            continue;
        }

        let result = navigator.find_path(request.from, request.goal);
        if result.is_empty() {
            warn!(
                "[PATHFINDING] No path from {:?} to {:?} for {:?}",
                request.from, request.goal, request.entity
            );
            continue;
        }

        highlight.portals = result.portal_trace;
        match commands.get_entity(request.entity) {
            Ok(mut entity) => {
                entity.insert(AutopilotPath::new(result.path));
            }
            Err(_) => warn!("Path request for missing entity {:?}", request.entity),
        }
    }

    let total_duration = start_time.elapsed();
    if total_duration.as_millis() > config.slow_query_warn_ms as u128 {
        warn!("[PATHFINDING] Slow batch processing: {:?} for {} requests", total_duration, request_count);
    }
}

/// Step agents along their waypoints and drop finished paths.
pub fn follow_autopilot(
    mut commands: Commands,
    config: Res<NavConfig>,
    mut agents: Query<(Entity, &Transform, &mut AutopilotPath)>,
) {
    for (entity, transform, mut path) in agents.iter_mut() {
        if path.advance(transform.translation.truncate(), config.arrival_threshold).is_none() {
            commands.entity(entity).remove::<AutopilotPath>();
        }
    }
}
