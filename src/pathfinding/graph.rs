use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use crate::structures::{Node, TileRect};
use super::sector::Sector;
use super::types::{Portal, PortalConnection, SectorCoord};

/// Hierarchical pathfinding graph for a static dungeon grid.
///
/// Divides the grid into sectors connected by portals so that queries
/// search a small abstract graph instead of every tile.
///
/// # Algorithm
///
/// 1. **Sectors:** Split the grid into `sector_size × sector_size` squares
/// 2. **Portals:** Find walkable spans across every sector border
/// 3. **Intra-sector edges:** Tile A* between each pair of portals sharing a sector
/// 4. **Flow fields:** One cached distance field per (sector, portal)
///
/// At query time A* runs over the portals and the cached flow fields turn
/// each portal hop into tile steps.
///
/// # Example Workflow
///
/// ```rust,ignore
/// // 1. Build once per loaded grid
/// let graph = prebuild(&grid);
///
/// // 2. Query as often as needed
/// let result = find_path(&graph, &grid, from, to);
/// ```
///
/// # Scratch slots
///
/// Ids `portal_count()` and `portal_count() + 1` are reserved for the
/// temporary start and goal portals of a query. They never live in this
/// struct; see [`QueryOverlay`](super::QueryOverlay).
#[derive(Resource, Default, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortalGraph {
    pub sector_size: usize,
    pub grid_width: usize,
    pub grid_height: usize,
    pub sectors_wide: usize,
    pub sectors_high: usize,
    pub portals: Vec<Portal>,
    pub sectors: Vec<Sector>,
    pub initialized: bool,
}

/// Summary numbers for logs and debug overlays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub sectors: usize,
    pub portals: usize,
    pub connections: usize,
    pub flow_fields: usize,
}

impl PortalGraph {
    pub fn grid_extent(&self) -> Node {
        Node::new(self.grid_width, self.grid_height)
    }

    /// Number of real portals. Scratch ids start here.
    pub fn portal_count(&self) -> usize {
        self.portals.len()
    }

    /// Ids reserved for a query's temporary start and goal portals.
    pub fn scratch_ids(&self) -> (usize, usize) {
        (self.portals.len(), self.portals.len() + 1)
    }

    pub fn portal(&self, id: usize) -> Option<&Portal> {
        self.portals.get(id)
    }

    pub fn sector_index(&self, coord: SectorCoord) -> Option<usize> {
        if coord.x >= self.sectors_wide || coord.y >= self.sectors_high {
            return None;
        }
        Some(coord.y * self.sectors_wide + coord.x)
    }

    pub fn sector(&self, coord: SectorCoord) -> Option<&Sector> {
        self.sector_index(coord).and_then(|idx| self.sectors.get(idx))
    }

    pub(super) fn sector_mut(&mut self, coord: SectorCoord) -> Option<&mut Sector> {
        let idx = self.sector_index(coord)?;
        self.sectors.get_mut(idx)
    }

    /// Sector containing `node`, if the node lies on the grid.
    pub fn sector_of(&self, node: Node) -> Option<SectorCoord> {
        if self.sector_size == 0 || node.x >= self.grid_width || node.y >= self.grid_height {
            return None;
        }
        Some(SectorCoord::containing(node, self.sector_size))
    }

    pub fn sector_bounds(&self, coord: SectorCoord) -> Option<TileRect> {
        self.sector(coord).map(|s| s.bounds)
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            sectors: self.sectors.len(),
            portals: self.portals.len(),
            connections: self.portals.iter().map(|p| p.connections.len()).sum(),
            flow_fields: self.sectors.iter().map(|s| s.flow_fields.len()).sum(),
        }
    }

    /// Cost of the direct edge `from -> to`, if any.
    pub fn connection_cost(&self, from: usize, to: usize) -> Option<u32> {
        self.portal(from)?
            .connections
            .iter()
            .filter(|c| c.target == to)
            .map(|c| c.cost)
            .min()
    }
}

/// Read access to a portal graph for searching.
///
/// Implemented by the cached [`PortalGraph`] on its own and by the query
/// view that layers a query's temporary portals on top of it.
pub trait PortalNetwork {
    /// Number of addressable portal ids.
    fn node_count(&self) -> usize;

    fn midpoint(&self, id: usize) -> Option<Vec2>;

    fn connections(&self, id: usize) -> impl Iterator<Item = &PortalConnection>;
}

impl PortalNetwork for PortalGraph {
    fn node_count(&self) -> usize {
        self.portals.len()
    }

    fn midpoint(&self, id: usize) -> Option<Vec2> {
        self.portal(id).map(Portal::midpoint)
    }

    fn connections(&self, id: usize) -> impl Iterator<Item = &PortalConnection> {
        self.portal(id).into_iter().flat_map(|p| p.connections.iter())
    }
}
