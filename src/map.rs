use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use flate2::write::ZlibEncoder;
use flate2::read::ZlibDecoder;
use flate2::Compression;
use crate::pathfinding::PortalGraph;
use crate::structures::{DungeonGrid, GridError};

/// Bump whenever the serialized layout of [`PortalGraph`] changes.
pub const MAP_VERSION: u32 = 1;

/// On-disk form of a prebuilt graph, tagged with the grid it was built for.
#[derive(Serialize, Deserialize)]
pub struct GraphCache {
    pub version: u32,
    pub grid_width: usize,
    pub grid_height: usize,
    pub sector_size: usize,
    pub graph: PortalGraph,
}

#[derive(Debug)]
pub enum MapError {
    Io(std::io::Error),
    Encode(bincode::Error),
    Grid(GridError),
    VersionMismatch { found: u32, expected: u32 },
    GridMismatch { cached: (usize, usize), actual: (usize, usize) },
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::Io(e) => write!(f, "i/o error: {}", e),
            MapError::Encode(e) => write!(f, "graph cache encoding error: {}", e),
            MapError::Grid(e) => write!(f, "invalid dungeon: {}", e),
            MapError::VersionMismatch { found, expected } => {
                write!(f, "graph cache version {} (expected {})", found, expected)
            }
            MapError::GridMismatch { cached, actual } => write!(
                f,
                "graph cache built for a {}x{} grid, dungeon is {}x{}",
                cached.0, cached.1, actual.0, actual.1
            ),
        }
    }
}

impl std::error::Error for MapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MapError::Io(e) => Some(e),
            MapError::Encode(e) => Some(e),
            MapError::Grid(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MapError {
    fn from(e: std::io::Error) -> Self {
        MapError::Io(e)
    }
}

impl From<bincode::Error> for MapError {
    fn from(e: bincode::Error) -> Self {
        MapError::Encode(e)
    }
}

impl From<GridError> for MapError {
    fn from(e: GridError) -> Self {
        MapError::Grid(e)
    }
}

/// Read an ASCII dungeon (`#` wall, `.` or space floor, one row per line).
pub fn load_dungeon(path: impl AsRef<Path>) -> Result<DungeonGrid, MapError> {
    let text = std::fs::read_to_string(path)?;
    Ok(DungeonGrid::from_ascii(&text)?)
}

pub fn save_graph(path: impl AsRef<Path>, graph: &PortalGraph) -> Result<(), MapError> {
    let cache = GraphCache {
        version: MAP_VERSION,
        grid_width: graph.grid_width,
        grid_height: graph.grid_height,
        sector_size: graph.sector_size,
        graph: graph.clone(),
    };
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let mut encoder = ZlibEncoder::new(writer, Compression::default());
    bincode::serialize_into(&mut encoder, &cache)?;
    encoder.finish()?;
    Ok(())
}

/// Load a cached graph and check it was built for `grid`.
pub fn load_graph(path: impl AsRef<Path>, grid: &DungeonGrid) -> Result<PortalGraph, MapError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut decoder = ZlibDecoder::new(reader);
    let cache: GraphCache = bincode::deserialize_from(&mut decoder)?;

    if cache.version != MAP_VERSION {
        return Err(MapError::VersionMismatch { found: cache.version, expected: MAP_VERSION });
    }
    if (cache.grid_width, cache.grid_height) != (grid.width(), grid.height()) {
        return Err(MapError::GridMismatch {
            cached: (cache.grid_width, cache.grid_height),
            actual: (grid.width(), grid.height()),
        });
    }
    Ok(cache.graph)
}

/// Use the cache at `path` when it matches `grid` and `sector_size`,
/// otherwise build and try to write a fresh cache.
pub fn load_or_build_graph(path: impl AsRef<Path>, grid: &DungeonGrid, sector_size: usize) -> PortalGraph {
    let path = path.as_ref();
    match load_graph(path, grid) {
        Ok(graph) if graph.sector_size == sector_size => {
            info!("Loaded portal graph from {}", path.display());
            return graph;
        }
        Ok(graph) => {
            warn!(
                "Cached graph uses sector size {}, wanted {}; rebuilding",
                graph.sector_size, sector_size
            );
        }
        Err(e) => warn!("Could not use graph cache {}: {}", path.display(), e),
    }

    let graph = PortalGraph::build(grid, sector_size);
    if let Err(e) = save_graph(path, &graph) {
        error!("Failed to save graph cache {}: {}", path.display(), e);
    }
    graph
}
