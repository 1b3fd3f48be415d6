use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::coords::{Node, TileRect};

/// Kind of a single dungeon tile.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    Wall = b'#',
    Floor = b'.',
}

impl TileKind {
    pub fn from_char(ch: char) -> Option<Self> {
        match ch {
            '#' => Some(TileKind::Wall),
            '.' | ' ' => Some(TileKind::Floor),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        self as u8 as char
    }
}

/// Static tile grid the pathfinder runs on.
///
/// Supplied once by the content generator and never mutated by the
/// navigation code. Row-major, `index = y * width + x`.
///
/// # Example
///
/// ```rust
/// use dungeon_nav::structures::{DungeonGrid, Node};
///
/// let grid = DungeonGrid::from_ascii("\
/// #####
/// #..#
/// #####").unwrap();
/// assert!(grid.is_walkable(Node::new(1, 1)));
/// assert!(!grid.is_walkable(Node::new(0, 0)));
/// ```
#[derive(Resource, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DungeonGrid {
    width: usize,
    height: usize,
    tiles: Vec<TileKind>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    Empty,
    SizeMismatch { expected: usize, actual: usize },
    RaggedRow { row: usize, expected: usize, actual: usize },
    UnknownTile { ch: char, x: usize, y: usize },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("dungeon grid must not be empty"),
            Self::SizeMismatch { expected, actual } => {
                write!(f, "expected {expected} tiles, got {actual}")
            }
            Self::RaggedRow { row, expected, actual } => {
                write!(f, "row {row} has {actual} tiles, expected {expected}")
            }
            Self::UnknownTile { ch, x, y } => write!(f, "unknown tile {ch:?} at ({x}, {y})"),
        }
    }
}

impl std::error::Error for GridError {}

impl DungeonGrid {
    pub fn new(width: usize, height: usize, tiles: Vec<TileKind>) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::Empty);
        }
        if tiles.len() != width * height {
            return Err(GridError::SizeMismatch { expected: width * height, actual: tiles.len() });
        }
        Ok(Self { width, height, tiles })
    }

    pub fn filled(width: usize, height: usize, kind: TileKind) -> Self {
        Self { width, height, tiles: vec![kind; width * height] }
    }

    /// Parse a grid from rows of `#` (wall) and `.`/space (floor).
    /// Trailing newline and `\r` are ignored.
    pub fn from_ascii(text: &str) -> Result<Self, GridError> {
        let rows: Vec<&str> = text.lines().map(|l| l.trim_end_matches('\r')).collect();
        let height = rows.len();
        let width = rows.first().map(|r| r.chars().count()).unwrap_or(0);
        if width == 0 {
            return Err(GridError::Empty);
        }

        let mut tiles = Vec::with_capacity(width * height);
        for (y, row) in rows.iter().enumerate() {
            let count = row.chars().count();
            if count != width {
                return Err(GridError::RaggedRow { row: y, expected: width, actual: count });
            }
            for (x, ch) in row.chars().enumerate() {
                let kind = TileKind::from_char(ch).ok_or(GridError::UnknownTile { ch, x, y })?;
                tiles.push(kind);
            }
        }
        Self::new(width, height, tiles)
    }

    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for row in self.tiles.chunks(self.width) {
            out.extend(row.iter().map(|t| t.as_char()));
            out.push('\n');
        }
        out
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn tiles(&self) -> &[TileKind] {
        &self.tiles
    }

    /// Exclusive upper corner, usable as a clamp limit.
    pub fn extent(&self) -> Node {
        Node::new(self.width, self.height)
    }

    pub fn bounds(&self) -> TileRect {
        TileRect::new(Node::new(0, 0), self.extent())
    }

    #[inline]
    pub fn get_index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn contains(&self, node: Node) -> bool {
        node.x < self.width && node.y < self.height
    }

    #[inline]
    pub fn get(&self, node: Node) -> Option<TileKind> {
        if !self.contains(node) {
            return None;
        }
        Some(self.tiles[self.get_index(node.x, node.y)])
    }

    #[inline]
    pub fn is_walkable(&self, node: Node) -> bool {
        self.get(node) == Some(TileKind::Floor)
    }

    /// Tile under a grid-space position, if it lies on the grid.
    pub fn tile_at(&self, pos: Vec2) -> Option<Node> {
        Node::from_position(pos).filter(|n| self.contains(*n))
    }

    /// Used by generators and tests while the grid is still being authored.
    pub fn set(&mut self, node: Node, kind: TileKind) {
        if self.contains(node) {
            let idx = self.get_index(node.x, node.y);
            self.tiles[idx] = kind;
        }
    }

    pub fn fill_rect(&mut self, rect: TileRect, kind: TileKind) {
        for node in rect.intersect(&self.bounds()).iter() {
            self.set(node, kind);
        }
    }

    pub fn floor_count(&self) -> usize {
        self.tiles.iter().filter(|t| **t == TileKind::Floor).count()
    }

    /// Uniformly random floor tile, used to place spawned agents.
    pub fn find_walkable_tile<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Node> {
        let floors = self.floor_count();
        if floors == 0 {
            return None;
        }
        let pick = rng.random_range(0..floors);
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, t)| **t == TileKind::Floor)
            .nth(pick)
            .map(|(idx, _)| Node::new(idx % self.width, idx / self.width))
    }
}
