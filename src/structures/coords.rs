use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// A tile coordinate on the dungeon grid.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Node {
    pub x: usize,
    pub y: usize,
}

impl Node {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Tile containing a grid-space position. Negative or non-finite
    /// positions have no tile.
    pub fn from_position(pos: Vec2) -> Option<Self> {
        if !pos.is_finite() || pos.x < 0.0 || pos.y < 0.0 {
            return None;
        }
        Some(Self {
            x: pos.x.floor() as usize,
            y: pos.y.floor() as usize,
        })
    }

    pub fn to_position(self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32)
    }

    /// The four orthogonal neighbours. Underflowing coordinates wrap to
    /// `usize::MAX` and are rejected by any bounds check.
    #[inline]
    pub fn neighbors(self) -> [Node; 4] {
        [
            Node::new(self.x + 1, self.y),
            Node::new(self.x.wrapping_sub(1), self.y),
            Node::new(self.x, self.y + 1),
            Node::new(self.x, self.y.wrapping_sub(1)),
        ]
    }

    pub fn manhattan(self, other: Node) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    pub fn is_adjacent(self, other: Node) -> bool {
        self.manhattan(other) == 1
    }
}

/// Axis-aligned tile rectangle with an inclusive `min` and exclusive `max`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct TileRect {
    pub min: Node,
    pub max: Node,
}

impl TileRect {
    pub const fn new(min: Node, max: Node) -> Self {
        Self { min, max }
    }

    pub fn width(&self) -> usize {
        self.max.x.saturating_sub(self.min.x)
    }

    pub fn height(&self) -> usize {
        self.max.y.saturating_sub(self.min.y)
    }

    pub fn area(&self) -> usize {
        self.width() * self.height()
    }

    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }

    #[inline]
    pub fn contains(&self, node: Node) -> bool {
        node.x >= self.min.x && node.x < self.max.x && node.y >= self.min.y && node.y < self.max.y
    }

    /// Row-major index of `node` relative to `min`.
    #[inline]
    pub fn local_index(&self, node: Node) -> Option<usize> {
        if !self.contains(node) {
            return None;
        }
        Some((node.y - self.min.y) * self.width() + (node.x - self.min.x))
    }

    pub fn node_at(&self, local_index: usize) -> Node {
        let w = self.width().max(1);
        Node::new(self.min.x + local_index % w, self.min.y + local_index / w)
    }

    /// Grow by `by` tiles on every side, clamped to `[0, limit)`.
    pub fn expanded(&self, by: usize, limit: Node) -> Self {
        Self {
            min: Node::new(self.min.x.saturating_sub(by), self.min.y.saturating_sub(by)),
            max: Node::new((self.max.x + by).min(limit.x), (self.max.y + by).min(limit.y)),
        }
    }

    pub fn intersect(&self, other: &TileRect) -> Self {
        let min = Node::new(self.min.x.max(other.min.x), self.min.y.max(other.min.y));
        let max = Node::new(self.max.x.min(other.max.x).max(min.x), self.max.y.min(other.max.y).max(min.y));
        Self { min, max }
    }

    pub fn iter(&self) -> impl Iterator<Item = Node> + '_ {
        (self.min.y..self.max.y).flat_map(move |y| (self.min.x..self.max.x).map(move |x| Node::new(x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_position_floors_fractional_coordinates() {
        assert_eq!(Node::from_position(Vec2::new(3.7, 0.2)), Some(Node::new(3, 0)));
        assert_eq!(Node::from_position(Vec2::new(-0.1, 2.0)), None);
        assert_eq!(Node::from_position(Vec2::new(f32::NAN, 2.0)), None);
    }

    #[test]
    fn expanded_rect_is_clamped_to_limit() {
        let rect = TileRect::new(Node::new(0, 10), Node::new(10, 20));
        let padded = rect.expanded(1, Node::new(15, 20));
        assert_eq!(padded.min, Node::new(0, 9));
        assert_eq!(padded.max, Node::new(11, 20));
    }

    #[test]
    fn local_index_round_trips_through_node_at() {
        let rect = TileRect::new(Node::new(4, 2), Node::new(9, 6));
        for node in rect.iter() {
            let idx = rect.local_index(node).unwrap();
            assert_eq!(rect.node_at(idx), node);
        }
        assert_eq!(rect.local_index(Node::new(9, 2)), None);
    }
}
