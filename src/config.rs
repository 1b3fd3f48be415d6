use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::pathfinding::SECTOR_SIZE;

pub const NAV_CONFIG_PATH: &str = "assets/nav_config.ron";

/// Navigation settings, read once at startup. Changing `sector_size`
/// only takes effect on the next graph rebuild.
#[derive(Resource, Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct NavConfig {
    pub sector_size: usize,

    // Logging thresholds
    pub slow_build_warn_ms: u64,
    pub slow_query_warn_ms: u64,
    pub max_pending_requests: usize,

    // Agents
    pub arrival_threshold: f32,

    /// Where `load_or_build_graph` keeps the compressed graph, if anywhere.
    pub graph_cache_path: Option<String>,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            sector_size: SECTOR_SIZE,
            slow_build_warn_ms: 500,
            slow_query_warn_ms: 100,
            max_pending_requests: 10,
            arrival_threshold: 0.1,
            graph_cache_path: None,
        }
    }
}

impl NavConfig {
    /// Read a RON config file. Missing or malformed files are logged and
    /// replaced by the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => match ron::from_str::<NavConfig>(&contents) {
                Ok(config) => {
                    info!("Loaded nav config from {}", path.display());
                    config
                }
                Err(e) => {
                    error!("Failed to parse nav config: {}", e);
                    error!("Using default NavConfig");
                    NavConfig::default()
                }
            },
            Err(e) => {
                error!("Failed to read {}: {}", path.display(), e);
                error!("Using default NavConfig");
                NavConfig::default()
            }
        }
    }
}

/// Loads [`NavConfig`] from [`NAV_CONFIG_PATH`] at startup.
pub struct NavConfigPlugin;

impl Plugin for NavConfigPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, load_nav_config);
    }
}

fn load_nav_config(mut commands: Commands) {
    commands.insert_resource(NavConfig::load_or_default(NAV_CONFIG_PATH));
}
