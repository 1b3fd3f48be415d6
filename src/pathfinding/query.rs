use bevy::prelude::*;
use dungeon_nav_macros::profile;
use crate::structures::{DungeonGrid, Node};
use super::astar::find_path_astar_local;
use super::graph::{PortalGraph, PortalNetwork};
use super::portal_astar::find_portal_path;
use super::sector_flow::{generate_sector_flow_field, SectorFlowField};
use super::types::{PathSearchResult, Portal, PortalConnection, UNREACHABLE};

/// Query-local portals layered over a cached [`PortalGraph`].
///
/// Holds the temporary start and goal portals, their connections to the
/// real portals of their sectors, and the goal's flow field. The graph
/// itself is never touched, so any number of overlays can exist at once.
#[derive(Clone, Debug)]
pub struct QueryOverlay {
    pub from_id: usize,
    pub to_id: usize,
    pub from_portal: Portal,
    pub to_portal: Portal,
    /// Edges from real portals into the goal portal, keyed by source id.
    pub incoming: Vec<(usize, PortalConnection)>,
    pub to_field: SectorFlowField,
}

impl QueryOverlay {
    /// Connect `start` and `goal` to the portals of their sectors.
    ///
    /// Edge costs are read off flow fields. The start edge is the cached
    /// field's value at `start`, which is exactly what the first descent
    /// walks. A goal edge is the goal field's minimum over the portal span.
    ///
    /// Returns `None` if either tile lies outside the graph's sectors.
    pub fn new(graph: &PortalGraph, grid: &DungeonGrid, start: Node, goal: Node) -> Option<Self> {
        let (from_id, to_id) = graph.scratch_ids();
        let from_sector = graph.sector(graph.sector_of(start)?)?;
        let to_sector = graph.sector(graph.sector_of(goal)?)?;

        let mut from_portal = Portal::single_tile(from_id, start, from_sector.id);
        for (&portal_id, field) in from_sector.portals.iter().zip(&from_sector.flow_fields) {
            let cost = field.get(start);
            if cost != UNREACHABLE {
                from_portal.connections.push(PortalConnection { target: portal_id, sector: from_sector.id, cost });
            }
        }

        let mut to_portal = Portal::single_tile(to_id, goal, to_sector.id);
        let to_field = generate_sector_flow_field(grid, &to_portal, to_sector.padded_bounds);

        let mut incoming = Vec::new();
        for &portal_id in &to_sector.portals {
            let span = graph.portals[portal_id].span();
            let Some(cost) = span.iter().map(|node| to_field.get(node)).min() else {
                continue;
            };
            if cost != UNREACHABLE {
                incoming.push((portal_id, PortalConnection { target: to_id, sector: to_sector.id, cost }));
                to_portal.connections.push(PortalConnection { target: portal_id, sector: to_sector.id, cost });
            }
        }

        Some(Self { from_id, to_id, from_portal, to_portal, incoming, to_field })
    }
}

/// A [`PortalGraph`] seen together with one query's overlay.
pub struct QueryView<'a> {
    graph: &'a PortalGraph,
    overlay: &'a QueryOverlay,
}

impl<'a> QueryView<'a> {
    pub fn new(graph: &'a PortalGraph, overlay: &'a QueryOverlay) -> Self {
        Self { graph, overlay }
    }
}

impl PortalNetwork for QueryView<'_> {
    fn node_count(&self) -> usize {
        self.graph.portal_count() + 2
    }

    fn midpoint(&self, id: usize) -> Option<Vec2> {
        if id == self.overlay.from_id {
            Some(self.overlay.from_portal.midpoint())
        } else if id == self.overlay.to_id {
            Some(self.overlay.to_portal.midpoint())
        } else {
            self.graph.midpoint(id)
        }
    }

    fn connections(&self, id: usize) -> impl Iterator<Item = &PortalConnection> {
        let own: &[PortalConnection] = if id == self.overlay.from_id {
            self.overlay.from_portal.connections.as_slice()
        } else if id == self.overlay.to_id {
            self.overlay.to_portal.connections.as_slice()
        } else {
            match self.graph.portal(id) {
                Some(portal) => portal.connections.as_slice(),
                None => &[],
            }
        };
        let incoming = self
            .overlay
            .incoming
            .iter()
            .filter(move |(source, _)| *source == id)
            .map(|(_, conn)| conn);
        own.iter().chain(incoming)
    }
}

/// Resolve a path query against a prebuilt graph.
///
/// Both points in one sector: bounded tile A* inside that sector. If that
/// fails, or the points lie in different sectors, the query runs through
/// the portal graph and descends the cached flow fields hop by hop.
///
/// Returns an empty result for points off the grid, a goal on a wall, a
/// graph that was never built, or when no path exists.
///
/// # Panics
///
/// If a flow field along the portal path does not lead to its portal.
/// That means the graph does not belong to `grid`.
#[profile(5)]
pub fn find_path(graph: &PortalGraph, grid: &DungeonGrid, from: Vec2, to: Vec2) -> PathSearchResult {
    if !graph.initialized {
        warn!("[PATHFINDING] Query before the portal graph was built");
        return PathSearchResult::empty();
    }
    if graph.grid_extent() != grid.extent() {
        warn!(
            "[PATHFINDING] Portal graph was built for {:?}, grid is {:?}",
            graph.grid_extent(),
            grid.extent()
        );
        return PathSearchResult::empty();
    }
    let (Some(start), Some(goal)) = (grid.tile_at(from), grid.tile_at(to)) else {
        return PathSearchResult::empty();
    };
    if !grid.is_walkable(start) || !grid.is_walkable(goal) {
        return PathSearchResult::empty();
    }
    let (Some(from_sector), Some(to_sector)) = (graph.sector_of(start), graph.sector_of(goal)) else {
        return PathSearchResult::empty();
    };

    if from_sector == to_sector {
        if let Some(bounds) = graph.sector_bounds(from_sector) {
            let tiles = find_path_astar_local(grid, start, goal, bounds);
            if !tiles.is_empty() {
                return PathSearchResult::from_tiles(from, to, &tiles, Vec::new());
            }
        }
        debug!("[PATHFINDING] No path inside sector {:?}, trying portals", from_sector);
    }

    find_path_through_portals(graph, grid, from, to, start, goal)
}

fn find_path_through_portals(
    graph: &PortalGraph,
    grid: &DungeonGrid,
    from: Vec2,
    to: Vec2,
    start: Node,
    goal: Node,
) -> PathSearchResult {
    let Some(overlay) = QueryOverlay::new(graph, grid, start, goal) else {
        return PathSearchResult::empty();
    };
    trace!("[PATHFINDING] Goal field:\n{}", overlay.to_field.to_debug_string(Some(goal)));

    let view = QueryView::new(graph, &overlay);
    let hops = find_portal_path(&view, overlay.from_id, overlay.to_id);
    if hops.is_empty() {
        debug!("[PATHFINDING] No portal path from {:?} to {:?}", start, goal);
        return PathSearchResult::empty();
    }

    let mut tiles = vec![start];
    let mut portal_trace = Vec::with_capacity(hops.len() + 1);
    portal_trace.push(overlay.from_id);
    let mut current = start;

    for hop in &hops {
        let field = if hop.target == overlay.to_id {
            &overlay.to_field
        } else {
            let Some(field) = graph.sector(hop.sector).and_then(|s| s.get_flow_field(hop.target)) else {
                panic!("no cached flow field for portal {} in sector {:?}", hop.target, hop.sector);
            };
            field
        };
        current = field.descend(current, &mut tiles);
        portal_trace.push(hop.target);
    }

    debug_assert_eq!(current, goal);
    PathSearchResult::from_tiles(from, to, &tiles, portal_trace)
}

/// Anything that can answer path queries. Decision layers depend on this
/// and never see sectors or portals.
pub trait PathFinder {
    fn find_path(&self, from: Vec2, to: Vec2) -> PathSearchResult;
}

/// A grid paired with the graph built from it.
#[derive(Clone, Copy)]
pub struct Navigator<'a> {
    pub grid: &'a DungeonGrid,
    pub graph: &'a PortalGraph,
}

impl<'a> Navigator<'a> {
    pub fn new(grid: &'a DungeonGrid, graph: &'a PortalGraph) -> Self {
        Self { grid, graph }
    }
}

impl PathFinder for Navigator<'_> {
    fn find_path(&self, from: Vec2, to: Vec2) -> PathSearchResult {
        find_path(self.graph, self.grid, from, to)
    }
}
