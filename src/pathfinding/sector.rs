use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use crate::structures::{Node, TileRect};
use super::sector_flow::SectorFlowField;
use super::types::{Portal, SectorCoord};

/// One square partition of the dungeon grid.
///
/// `portals` and `flow_fields` are parallel: `flow_fields[i]` is the
/// distance field towards `portals[i]` over `padded_bounds`.
///
/// # Flow Field Cache
///
/// Every sector caches a field for each portal touching it during prebuild.
/// For a 10×10 sector the padded field is 12×12 `u32`s (576 bytes), and a
/// sector typically touches 2-8 portals, so the cache stays in the low
/// kilobytes per sector and never grows after the build.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Sector {
    pub id: SectorCoord,
    pub bounds: TileRect,
    pub padded_bounds: TileRect,
    pub portals: SmallVec<[usize; 8]>,
    pub flow_fields: Vec<SectorFlowField>,
}

impl Sector {
    pub fn new(id: SectorCoord, sector_size: usize, grid_extent: Node) -> Self {
        let min = Node::new(id.x * sector_size, id.y * sector_size);
        let max = Node::new(
            (min.x + sector_size).min(grid_extent.x),
            (min.y + sector_size).min(grid_extent.y),
        );
        let bounds = TileRect::new(min, max);
        Self {
            id,
            bounds,
            padded_bounds: bounds.expanded(1, grid_extent),
            portals: SmallVec::new(),
            flow_fields: Vec::new(),
        }
    }

    pub fn get_flow_field(&self, portal_id: usize) -> Option<&SectorFlowField> {
        let slot = self.portals.iter().position(|&id| id == portal_id)?;
        self.flow_fields.get(slot)
    }
}

/// Portal across a vertical border: `x_left` is the last column of the
/// western sector, the run covers rows `y_start..=y_end`.
pub(super) fn portal_vertical(
    id: usize,
    x_left: usize,
    y_start: usize,
    y_end: usize,
    west: SectorCoord,
    east: SectorCoord,
) -> Portal {
    Portal::new(id, Node::new(x_left, y_start), Node::new(x_left + 1, y_end), [west, east])
}

/// Portal across a horizontal border: `y_top` is the last row of the
/// northern sector, the run covers columns `x_start..=x_end`.
pub(super) fn portal_horizontal(
    id: usize,
    x_start: usize,
    x_end: usize,
    y_top: usize,
    north: SectorCoord,
    south: SectorCoord,
) -> Portal {
    Portal::new(id, Node::new(x_start, y_top), Node::new(x_end, y_top + 1), [north, south])
}
