//! Shared data structures used across the navigation modules
//!
//! The tile grid and its coordinate types are consumed by graph building,
//! queries and the engine integration alike.

mod coords;
mod dungeon_grid;

pub use coords::{Node, TileRect};
pub use dungeon_grid::{DungeonGrid, GridError, TileKind};
