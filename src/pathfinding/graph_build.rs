use bevy::prelude::*;
use dungeon_nav_macros::profile;
use crate::structures::{DungeonGrid, Node, TileRect};
use super::astar::path_steps;
use super::graph::PortalGraph;
use super::sector::{portal_horizontal, portal_vertical, Sector};
use super::sector_flow::generate_sector_flow_field;
use super::types::{Portal, PortalConnection, SectorCoord, SECTOR_SIZE};

/// Build the portal graph for `grid` with the default sector size.
pub fn prebuild(grid: &DungeonGrid) -> PortalGraph {
    PortalGraph::build(grid, SECTOR_SIZE)
}

impl PortalGraph {
    /// Synchronous full build. Expensive: every pair of portals in a sector
    /// is checked tile pair by tile pair, so call it once per loaded grid.
    #[profile(10)]
    pub fn build(grid: &DungeonGrid, sector_size: usize) -> PortalGraph {
        let sector_size = sector_size.max(1);
        let build_start = std::time::Instant::now();
        let mut graph = PortalGraph {
            sector_size,
            grid_width: grid.width(),
            grid_height: grid.height(),
            sectors_wide: grid.width().div_ceil(sector_size),
            sectors_high: grid.height().div_ceil(sector_size),
            ..Default::default()
        };

        info!("=== PORTAL GRAPH BUILD START ===");
        info!("  Grid: {} x {} tiles", grid.width(), grid.height());
        info!(
            "  Sectors: {} x {} ({} total, {}x{} tiles each)",
            graph.sectors_wide,
            graph.sectors_high,
            graph.sectors_wide * graph.sectors_high,
            sector_size,
            sector_size
        );

        initialize_sectors(&mut graph);
        find_portals(&mut graph, grid);
        info!("Found {} portals in {:?}", graph.portals.len(), build_start.elapsed());

        let connect_start = std::time::Instant::now();
        for idx in 0..graph.sectors.len() {
            connect_intra_sector(&mut graph, grid, idx);
        }
        info!(
            "Connected intra-sector portals ({} edges) in {:?}",
            graph.stats().connections,
            connect_start.elapsed()
        );

        let flow_start = std::time::Instant::now();
        for idx in 0..graph.sectors.len() {
            precompute_flow_fields_for_sector(&mut graph, grid, idx);
        }
        info!(
            "Precomputed {} flow fields in {:?}",
            graph.stats().flow_fields,
            flow_start.elapsed()
        );

        graph.initialized = true;
        info!("=== PORTAL GRAPH BUILD COMPLETE in {:?} ===", build_start.elapsed());
        graph
    }
}

fn initialize_sectors(graph: &mut PortalGraph) {
    let extent = graph.grid_extent();
    graph.sectors.clear();
    for sy in 0..graph.sectors_high {
        for sx in 0..graph.sectors_wide {
            graph.sectors.push(Sector::new(SectorCoord::new(sx, sy), graph.sector_size, extent));
        }
    }
}

/// Scan the top and left border of every sector. Each maximal run of tile
/// pairs that are floor on both sides becomes one portal.
fn find_portals(graph: &mut PortalGraph, grid: &DungeonGrid) {
    for idx in 0..graph.sectors.len() {
        let (id, bounds) = (graph.sectors[idx].id, graph.sectors[idx].bounds);

        if id.y > 0 {
            let y = bounds.min.y;
            let north = SectorCoord::new(id.x, id.y - 1);
            for (x_start, x_end) in walkable_runs(bounds.min.x..bounds.max.x, |x| {
                grid.is_walkable(Node::new(x, y)) && grid.is_walkable(Node::new(x, y - 1))
            }) {
                let portal = portal_horizontal(graph.portals.len(), x_start, x_end, y - 1, north, id);
                register_portal(graph, portal);
            }
        }

        if id.x > 0 {
            let x = bounds.min.x;
            let west = SectorCoord::new(id.x - 1, id.y);
            for (y_start, y_end) in walkable_runs(bounds.min.y..bounds.max.y, |y| {
                grid.is_walkable(Node::new(x, y)) && grid.is_walkable(Node::new(x - 1, y))
            }) {
                let portal = portal_vertical(graph.portals.len(), x - 1, y_start, y_end, west, id);
                register_portal(graph, portal);
            }
        }
    }
}

/// Inclusive `(start, end)` of every maximal run where `walkable` holds.
fn walkable_runs(range: std::ops::Range<usize>, walkable: impl Fn(usize) -> bool) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start_segment = None;
    let end = range.end;
    for i in range {
        if walkable(i) {
            if start_segment.is_none() {
                start_segment = Some(i);
            }
        } else if let Some(s) = start_segment.take() {
            runs.push((s, i - 1));
        }
    }
    if let Some(s) = start_segment {
        runs.push((s, end - 1));
    }
    runs
}

fn register_portal(graph: &mut PortalGraph, portal: Portal) {
    let id = portal.id;
    for sector in portal.sectors {
        if let Some(sector) = graph.sector_mut(sector) {
            sector.portals.push(id);
        }
    }
    graph.portals.push(portal);
}

/// Shortest tile distance between two portal spans inside `bounds`.
///
/// Every tile pair of the clamped spans is searched and the minimum kept.
/// The first unreachable pair ends the check: the in-sector side of a span
/// is a contiguous floor line, so if one pair cannot connect none can.
pub(super) fn span_distance(grid: &DungeonGrid, a: TileRect, b: TileRect, bounds: TileRect) -> Option<u32> {
    let a = a.intersect(&bounds);
    let b = b.intersect(&bounds);
    if a.is_empty() || b.is_empty() {
        return None;
    }

    let mut min_dist: Option<u32> = None;
    for from in a.iter() {
        for to in b.iter() {
            let steps = path_steps(grid, from, to, bounds)?;
            min_dist = Some(min_dist.map_or(steps, |d| d.min(steps)));
        }
    }
    min_dist
}

/// Connect every pair of portals touching the sector at `sector_idx`.
pub(crate) fn connect_intra_sector(graph: &mut PortalGraph, grid: &DungeonGrid, sector_idx: usize) {
    let sector = &graph.sectors[sector_idx];
    let sector_id = sector.id;
    let bounds = sector.bounds;
    let portals = sector.portals.clone();

    for i in 0..portals.len() {
        for j in i + 1..portals.len() {
            let id1 = portals[i];
            let id2 = portals[j];
            let span1 = graph.portals[id1].span();
            let span2 = graph.portals[id2].span();

            if let Some(cost) = span_distance(grid, span1, span2, bounds) {
                graph.portals[id1].connections.push(PortalConnection { target: id2, sector: sector_id, cost });
                graph.portals[id2].connections.push(PortalConnection { target: id1, sector: sector_id, cost });
            }
        }
    }
}

/// Cache one flow field per portal touching the sector at `sector_idx`.
pub(crate) fn precompute_flow_fields_for_sector(graph: &mut PortalGraph, grid: &DungeonGrid, sector_idx: usize) {
    let padded = graph.sectors[sector_idx].padded_bounds;
    let fields: Vec<_> = graph.sectors[sector_idx]
        .portals
        .iter()
        .map(|&portal_id| generate_sector_flow_field(grid, &graph.portals[portal_id], padded))
        .collect();
    graph.sectors[sector_idx].flow_fields = fields;
}
