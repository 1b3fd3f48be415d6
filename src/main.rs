use bevy::prelude::*;

use dungeon_nav::config::{NavConfig, NAV_CONFIG_PATH};
use dungeon_nav::map::{load_dungeon, load_or_build_graph};
use dungeon_nav::pathfinding::{Navigator, PathFinder, PortalGraph};

use tracing_subscriber::{filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const USAGE: &str = "usage: dungeon_nav <dungeon.txt> <from_x> <from_y> <to_x> <to_y> [graph cache]";

const LOG_DIR: &str = "logs";
const LOG_PREFIX: &str = "dungeon_nav_";
const LOGS_KEPT: usize = 25;

/// One log file per query run. Stdout carries the path itself, so the
/// console only gets warnings; the file gets everything `RUST_LOG` allows
/// (debug for this crate by default).
fn setup_file_logging() -> Result<PathBuf, Box<dyn Error>> {
    let log_dir = Path::new(LOG_DIR);
    fs::create_dir_all(log_dir)?;
    prune_logs(log_dir, LOGS_KEPT.saturating_sub(1));

    let file_name = format!("{}{}.log", LOG_PREFIX, chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let file_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,dungeon_nav=debug"));

    let file_layer = fmt::layer()
        .with_writer(RollingFileAppender::new(Rotation::NEVER, log_dir, &file_name))
        .with_ansi(false)
        .with_filter(file_filter);
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(LevelFilter::WARN);

    tracing_subscriber::registry().with(file_layer).with(console_layer).init();

    Ok(log_dir.join(file_name))
}

/// Delete the oldest run logs until at most `keep` remain.
fn prune_logs(log_dir: &Path, keep: usize) {
    let Ok(entries) = fs::read_dir(log_dir) else {
        return;
    };
    let mut runs: Vec<(SystemTime, PathBuf)> = entries
        .filter_map(Result::ok)
        .filter(|e| {
            let name = e.file_name();
            let name = name.to_string_lossy();
            name.starts_with(LOG_PREFIX) && name.ends_with(".log")
        })
        .filter_map(|e| Some((e.metadata().ok()?.modified().ok()?, e.path())))
        .collect();

    if runs.len() <= keep {
        return;
    }
    runs.sort();
    let excess = runs.len() - keep;
    for (_, path) in runs.drain(..excess) {
        let _ = fs::remove_file(path);
    }
}

fn parse_coord(arg: Option<&String>, name: &str) -> Result<f32, Box<dyn Error>> {
    let arg = arg.ok_or_else(|| format!("missing {}\n{}", name, USAGE))?;
    arg.parse::<f32>().map_err(|e| format!("bad {} {:?}: {}", name, arg, e).into())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let dungeon_path = args.first().ok_or(USAGE)?;
    let from = Vec2::new(parse_coord(args.get(1), "from_x")?, parse_coord(args.get(2), "from_y")?);
    let to = Vec2::new(parse_coord(args.get(3), "to_x")?, parse_coord(args.get(4), "to_y")?);

    let log_file = setup_file_logging()?;
    info!("Logging to {}", log_file.display());

    let config = NavConfig::load_or_default(NAV_CONFIG_PATH);
    let grid = load_dungeon(dungeon_path)?;
    info!("Loaded {}x{} dungeon from {}", grid.width(), grid.height(), dungeon_path);

    let cache_path = args.get(5).cloned().or_else(|| config.graph_cache_path.clone());
    let graph = match cache_path {
        Some(path) => load_or_build_graph(path, &grid, config.sector_size),
        None => PortalGraph::build(&grid, config.sector_size),
    };

    let result = Navigator::new(&grid, &graph).find_path(from, to);
    if result.is_empty() {
        println!("no path from {} to {}", from, to);
        return Ok(());
    }

    println!("{} steps, portals {:?}", result.step_count(), result.portal_trace);
    for waypoint in &result.path {
        println!("{} {}", waypoint.x, waypoint.y);
    }
    Ok(())
}
