pub mod config;
pub mod map;
pub mod pathfinding;
pub mod structures;
