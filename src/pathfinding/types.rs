use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use crate::structures::{Node, TileRect};

/// Default sector edge length in tiles (10×10 tiles per sector).
///
/// Grids are split into sectors of this size. Larger sectors mean fewer
/// portals but more expensive intra-sector connection checks during prebuild.
pub const SECTOR_SIZE: usize = 10;

/// Flow-field value for walls, tiles outside the field and tiles that cannot
/// reach the target portal.
pub const UNREACHABLE: u32 = u32::MAX;

/// Sector coordinate in the sector grid.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize, PartialOrd, Ord)]
pub struct SectorCoord {
    pub x: usize,
    pub y: usize,
}

impl SectorCoord {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    pub fn containing(node: Node, sector_size: usize) -> Self {
        Self { x: node.x / sector_size, y: node.y / sector_size }
    }
}

/// Directed edge of the portal graph.
///
/// `cost` is the number of tile steps between the two portals, measured
/// inside `sector`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct PortalConnection {
    pub target: usize,
    pub sector: SectorCoord,
    pub cost: u32,
}

/// A walkable span straddling the border between two adjacent sectors.
///
/// The span is stored as an inclusive tile rectangle covering the tiles on
/// both sides of the border. Query endpoints are modelled as single-tile
/// portals whose two sectors are the same.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Portal {
    pub id: usize,
    pub range_min: Node,
    pub range_max: Node,
    pub sectors: [SectorCoord; 2],
    pub connections: Vec<PortalConnection>,
}

impl Portal {
    pub fn new(id: usize, range_min: Node, range_max: Node, sectors: [SectorCoord; 2]) -> Self {
        Self { id, range_min, range_max, sectors, connections: Vec::new() }
    }

    pub fn single_tile(id: usize, node: Node, sector: SectorCoord) -> Self {
        Self::new(id, node, node, [sector, sector])
    }

    /// Canonical graph-node position.
    pub fn midpoint(&self) -> Vec2 {
        (self.range_min.to_position() + self.range_max.to_position()) * 0.5
    }

    pub fn span(&self) -> TileRect {
        TileRect::new(self.range_min, Node::new(self.range_max.x + 1, self.range_max.y + 1))
    }
}

/// Result of a path query.
///
/// `path` holds grid-space positions; the first and last entries are the
/// exact query endpoints, everything in between is a tile coordinate.
/// `portal_trace` lists the portal ids that were traversed, starting with
/// the temporary start portal and ending with the temporary goal portal.
/// Both are empty when no path exists.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PathSearchResult {
    pub path: Vec<Vec2>,
    pub portal_trace: Vec<usize>,
}

impl PathSearchResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Number of moves between consecutive waypoints.
    pub fn step_count(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    pub(crate) fn from_tiles(from: Vec2, to: Vec2, tiles: &[Node], portal_trace: Vec<usize>) -> Self {
        if tiles.is_empty() {
            return Self::empty();
        }
        let mut path: Vec<Vec2> = tiles.iter().map(|n| n.to_position()).collect();
        path[0] = from;
        if path.len() > 1 {
            let last = path.len() - 1;
            path[last] = to;
        } else if from != to {
            path.push(to);
        }
        Self { path, portal_trace }
    }
}

/// Ask the pathfinder to route `entity` from `from` to `goal`.
#[derive(Message, Debug, Clone)]
pub struct PathRequest {
    pub entity: Entity,
    pub from: Vec2,
    pub goal: Vec2,
}

/// Waypoints an agent is walking along.
#[derive(Component, Debug, Clone, Default, PartialEq)]
pub struct AutopilotPath {
    pub waypoints: Vec<Vec2>,
    pub current_index: usize,
}

impl AutopilotPath {
    pub fn new(waypoints: Vec<Vec2>) -> Self {
        Self { waypoints, current_index: 0 }
    }

    pub fn current(&self) -> Option<Vec2> {
        self.waypoints.get(self.current_index).copied()
    }

    pub fn is_finished(&self) -> bool {
        self.current_index >= self.waypoints.len()
    }

    /// Skip every waypoint within `arrival_threshold` of `pos` and return
    /// the next one to steer towards.
    pub fn advance(&mut self, pos: Vec2, arrival_threshold: f32) -> Option<Vec2> {
        while let Some(target) = self.current() {
            if target.distance(pos) > arrival_threshold {
                return Some(target);
            }
            self.current_index += 1;
        }
        None
    }
}

/// Portal ids of the most recent query, kept for debug overlays.
#[derive(Resource, Debug, Clone, Default)]
pub struct PortalHighlight {
    pub portals: Vec<usize>,
}
