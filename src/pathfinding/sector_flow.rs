use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt::Write as _;
use crate::structures::{DungeonGrid, Node, TileRect};
use super::types::{Portal, UNREACHABLE};

/// Distance-to-portal field over a padded sector rectangle.
///
/// Every floor tile of the portal span is 0, every other floor tile holds
/// its 4-connected step count to the nearest span tile inside `bounds`.
/// Walls and tiles that cannot reach the span hold [`UNREACHABLE`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorFlowField {
    pub bounds: TileRect,
    pub distances: Vec<u32>,
}

impl SectorFlowField {
    pub fn get(&self, node: Node) -> u32 {
        self.bounds
            .local_index(node)
            .map(|idx| self.distances[idx])
            .unwrap_or(UNREACHABLE)
    }

    pub fn reaches(&self, node: Node) -> bool {
        self.get(node) != UNREACHABLE
    }

    /// Greedy descent from `from` to the portal span.
    ///
    /// Each step moves to the 4-neighbour with the lowest distance and is
    /// appended to `out`. Returns the span tile the walk ends on.
    ///
    /// # Panics
    ///
    /// If `from` is not reachable in this field or a tile has no strictly
    /// lower neighbour. Both mean the graph was built inconsistently.
    pub fn descend(&self, from: Node, out: &mut Vec<Node>) -> Node {
        let mut current = from;
        let mut value = self.get(current);
        assert!(
            value != UNREACHABLE,
            "flow field over {:?} does not reach descent start {:?}",
            self.bounds,
            from
        );

        while value > 0 {
            let mut best = None;
            let mut best_value = value;
            for neighbor in current.neighbors() {
                let n_value = self.get(neighbor);
                if n_value < best_value {
                    best_value = n_value;
                    best = Some(neighbor);
                }
            }
            let Some(next) = best else {
                panic!(
                    "flow field descent stuck at {:?} (value {}) inside {:?}",
                    current, value, self.bounds
                );
            };
            current = next;
            value = best_value;
            out.push(current);
        }
        current
    }

    /// Text dump for debug logging; walls and unreachable tiles print as `W`.
    pub fn to_debug_string(&self, marker: Option<Node>) -> String {
        let mut out = String::new();
        for y in self.bounds.min.y..self.bounds.max.y {
            for x in self.bounds.min.x..self.bounds.max.x {
                let node = Node::new(x, y);
                let mark = if marker == Some(node) { '<' } else { ' ' };
                match self.get(node) {
                    UNREACHABLE => {
                        let _ = write!(out, "{:>4}{}", "W", mark);
                    }
                    v => {
                        let _ = write!(out, "{:>4}{}", v, mark);
                    }
                }
            }
            out.push('\n');
        }
        out
    }
}

/// Build the distance field from `portal` over `bounds` (already padded and
/// clamped by the caller). Multi-source breadth-first wavefront seeded with
/// every floor tile of the portal span.
pub fn generate_sector_flow_field(grid: &DungeonGrid, portal: &Portal, bounds: TileRect) -> SectorFlowField {
    let bounds = bounds.intersect(&grid.bounds());
    let mut distances = vec![UNREACHABLE; bounds.area()];
    let mut queue = VecDeque::new();

    for node in portal.span().intersect(&bounds).iter() {
        if !grid.is_walkable(node) {
            continue;
        }
        if let Some(idx) = bounds.local_index(node) {
            distances[idx] = 0;
            queue.push_back(node);
        }
    }

    while let Some(current) = queue.pop_front() {
        let Some(idx) = bounds.local_index(current) else {
            continue;
        };
        let next_cost = distances[idx] + 1;
        for neighbor in current.neighbors() {
            let Some(n_idx) = bounds.local_index(neighbor) else {
                continue;
            };
            if distances[n_idx] != UNREACHABLE || !grid.is_walkable(neighbor) {
                continue;
            }
            distances[n_idx] = next_cost;
            queue.push_back(neighbor);
        }
    }

    SectorFlowField { bounds, distances }
}
