/// Tests for hierarchical query resolution
///
/// These build small dungeons by hand, so the expected portals, traces and
/// path lengths can be worked out on paper.

use super::*;
use bevy::math::Vec2;
use crate::structures::{DungeonGrid, Node, TileKind, TileRect};

/// Helper to create an all-floor grid
fn open_grid(width: usize, height: usize) -> DungeonGrid {
    DungeonGrid::filled(width, height, TileKind::Floor)
}

/// Helper to add a wall column at `x` covering rows `y_start..y_end`
fn add_wall_column(grid: &mut DungeonGrid, x: usize, y_start: usize, y_end: usize) {
    grid.fill_rect(TileRect::new(Node::new(x, y_start), Node::new(x + 1, y_end)), TileKind::Wall);
}

fn pos(x: f32, y: f32) -> Vec2 {
    Vec2::new(x, y)
}

/// Every step moves to a 4-neighbour floor tile.
fn assert_valid_path(grid: &DungeonGrid, result: &PathSearchResult, goal: Node) {
    let tiles: Vec<Node> = result
        .path
        .iter()
        .map(|p| Node::from_position(*p).expect("negative waypoint"))
        .collect();
    for tile in &tiles {
        assert!(grid.is_walkable(*tile), "path crosses non-floor tile {:?}", tile);
    }
    for pair in tiles.windows(2) {
        assert!(pair[0].is_adjacent(pair[1]), "non-adjacent step {:?} -> {:?}", pair[0], pair[1]);
    }
    assert_eq!(tiles.last(), Some(&goal));
}

fn direct_steps(grid: &DungeonGrid, from: Node, to: Node) -> Option<u32> {
    path_steps(grid, from, to, grid.bounds())
}

#[test]
fn test_trivial_same_sector() {
    let grid = open_grid(10, 10);
    let graph = prebuild(&grid);

    let result = find_path(&graph, &grid, pos(1.0, 1.0), pos(8.0, 8.0));

    assert!(!result.is_empty());
    assert_eq!(result.step_count(), 14);
    assert!(result.portal_trace.is_empty(), "same-sector query uses no portals");
    assert_valid_path(&grid, &result, Node::new(8, 8));
}

#[test]
fn test_endpoints_keep_fractional_positions() {
    let grid = open_grid(20, 10);
    let graph = prebuild(&grid);

    let from = pos(1.25, 1.75);
    let to = pos(18.5, 8.5);
    let result = find_path(&graph, &grid, from, to);

    assert_eq!(result.path.first(), Some(&from));
    assert_eq!(result.path.last(), Some(&to));
    assert_valid_path(&grid, &result, Node::new(18, 8));
}

#[test]
fn test_open_two_sectors_matches_direct_length() {
    let grid = open_grid(20, 10);
    let graph = prebuild(&grid);
    assert_eq!(graph.portals.len(), 1, "one portal spans the whole shared border");

    let result = find_path(&graph, &grid, pos(1.0, 1.0), pos(18.0, 8.0));

    assert_eq!(result.step_count(), 24);
    assert_eq!(Some(result.step_count() as u32), direct_steps(&grid, Node::new(1, 1), Node::new(18, 8)));
    assert_valid_path(&grid, &result, Node::new(18, 8));
}

#[test]
fn test_single_doorway() {
    // Wall down x=9 except for a gap at y=5.
    let mut grid = open_grid(20, 10);
    add_wall_column(&mut grid, 9, 0, 5);
    add_wall_column(&mut grid, 9, 6, 10);
    let graph = prebuild(&grid);

    assert_eq!(graph.portals.len(), 1);
    let door = &graph.portals[0];
    assert_eq!((door.range_min, door.range_max), (Node::new(9, 5), Node::new(10, 5)));

    let result = find_path(&graph, &grid, pos(1.0, 1.0), pos(18.0, 8.0));

    // Start scratch portal, the door, goal scratch portal.
    assert_eq!(result.portal_trace, vec![1, 0, 2]);
    assert_eq!(result.step_count(), 24);
    assert_valid_path(&grid, &result, Node::new(18, 8));
    assert!(result.path.contains(&Vec2::new(9.0, 5.0)), "path must go through the door");
}

#[test]
fn test_disconnected_sectors_return_empty() {
    let mut grid = open_grid(20, 10);
    add_wall_column(&mut grid, 9, 0, 10);
    let graph = prebuild(&grid);

    assert!(graph.portals.is_empty());
    let result = find_path(&graph, &grid, pos(1.0, 1.0), pos(18.0, 8.0));
    assert!(result.is_empty());
    assert!(result.portal_trace.is_empty());
}

#[test]
fn test_wall_target_returns_empty() {
    let mut grid = open_grid(20, 10);
    grid.set(Node::new(15, 5), TileKind::Wall);
    let graph = prebuild(&grid);

    assert!(find_path(&graph, &grid, pos(1.0, 1.0), pos(15.5, 5.5)).is_empty());
    assert!(find_path(&graph, &grid, pos(16.0, 5.0), pos(15.0, 5.0)).is_empty());
}

#[test]
fn test_out_of_bounds_returns_empty() {
    let grid = open_grid(20, 10);
    let graph = prebuild(&grid);

    assert!(find_path(&graph, &grid, pos(-1.0, 0.0), pos(5.0, 5.0)).is_empty());
    assert!(find_path(&graph, &grid, pos(1.0, 1.0), pos(20.0, 5.0)).is_empty());
    assert!(find_path(&graph, &grid, pos(1.0, 1.0), pos(5.0, f32::NAN)).is_empty());
}

#[test]
fn test_unbuilt_or_foreign_graph_returns_empty() {
    let grid = open_grid(20, 10);
    assert!(find_path(&PortalGraph::default(), &grid, pos(1.0, 1.0), pos(5.0, 5.0)).is_empty());

    let other = prebuild(&open_grid(30, 10));
    assert!(find_path(&other, &grid, pos(1.0, 1.0), pos(5.0, 5.0)).is_empty());
}

#[test]
fn test_same_sector_falls_back_to_portals() {
    // Sector (0,0) is split by a wall at x=5; the halves only meet
    // through sector (0,1) below.
    let mut grid = open_grid(10, 20);
    add_wall_column(&mut grid, 5, 0, 10);
    let graph = prebuild(&grid);

    assert_eq!(graph.portals.len(), 2);
    assert_eq!(
        graph.portals[0].connections,
        vec![PortalConnection { target: 1, sector: SectorCoord::new(0, 1), cost: 2 }],
        "the halves connect only inside the lower sector"
    );

    let result = find_path(&graph, &grid, pos(1.0, 1.0), pos(8.0, 1.0));

    assert_eq!(result.portal_trace, vec![2, 0, 1, 3]);
    assert_eq!(result.step_count(), 25);
    assert_eq!(Some(25), direct_steps(&grid, Node::new(1, 1), Node::new(8, 1)));
    assert_valid_path(&grid, &result, Node::new(8, 1));
}

#[test]
fn test_queries_do_not_modify_graph() {
    let mut grid = open_grid(30, 30);
    add_wall_column(&mut grid, 12, 0, 25);
    add_wall_column(&mut grid, 21, 5, 30);
    let graph = prebuild(&grid);
    let before = graph.clone();

    let queries = [
        (pos(1.0, 1.0), pos(28.0, 28.0)),
        (pos(3.0, 3.0), pos(4.0, 4.0)),
        (pos(1.0, 1.0), pos(12.0, 3.0)),
        (pos(25.0, 1.0), pos(2.0, 27.0)),
    ];
    for (from, to) in queries {
        let _ = find_path(&graph, &grid, from, to);
    }

    assert_eq!(graph, before);
}

#[test]
fn test_overlay_uses_scratch_ids() {
    let grid = open_grid(20, 20);
    let graph = prebuild(&grid);
    let overlay = QueryOverlay::new(&graph, &grid, Node::new(1, 1), Node::new(18, 18)).unwrap();

    assert_eq!((overlay.from_id, overlay.to_id), (graph.portal_count(), graph.portal_count() + 1));
    // (0,0) touches the portals to its east and south neighbours.
    assert_eq!(overlay.from_portal.connections.len(), 2);
    assert_eq!(overlay.incoming.len(), 2);
    assert_eq!(overlay.to_field.get(Node::new(18, 18)), 0);

    let view = QueryView::new(&graph, &overlay);
    assert_eq!(view.node_count(), graph.portal_count() + 2);
    for &(source, conn) in &overlay.incoming {
        assert!(view.connections(source).any(|c| *c == conn));
        assert!(!graph.connections(source).any(|c| c.target == overlay.to_id));
    }
}

#[test]
fn test_open_grid_builds_expected_graph() {
    let grid = open_grid(20, 20);
    let graph = prebuild(&grid);

    let stats = graph.stats();
    assert_eq!(stats.sectors, 4);
    assert_eq!(stats.portals, 4);
    assert_eq!(stats.connections, 8, "one symmetric pair per sector");
    assert_eq!(stats.flow_fields, 8);

    // Portals 0 (east of (0,0)) and 1 (south of (0,0)) share the corner tile.
    assert_eq!(graph.connection_cost(0, 1), Some(0));
    assert_eq!(graph.connection_cost(1, 0), Some(0));
    assert_eq!(graph.connection_cost(0, 3), None);
}

#[test]
fn test_edge_sectors_are_clamped() {
    let grid = open_grid(25, 13);
    let graph = prebuild(&grid);

    assert_eq!((graph.sectors_wide, graph.sectors_high), (3, 2));
    let corner = graph.sector(SectorCoord::new(2, 1)).unwrap();
    assert_eq!(corner.bounds, TileRect::new(Node::new(20, 10), Node::new(25, 13)));
    assert_eq!(corner.padded_bounds, TileRect::new(Node::new(19, 9), Node::new(25, 13)));

    let result = find_path(&graph, &grid, pos(0.0, 0.0), pos(24.0, 12.0));
    assert_eq!(result.step_count(), 36);
}

#[test]
fn test_navigator_answers_through_trait() {
    fn route(finder: &impl PathFinder) -> PathSearchResult {
        finder.find_path(Vec2::new(1.0, 1.0), Vec2::new(18.0, 8.0))
    }

    let grid = open_grid(20, 10);
    let graph = prebuild(&grid);
    let navigator = Navigator::new(&grid, &graph);

    assert_eq!(route(&navigator), find_path(&graph, &grid, pos(1.0, 1.0), pos(18.0, 8.0)));
}

#[test]
fn test_rebuild_is_deterministic() {
    let mut grid = open_grid(30, 20);
    add_wall_column(&mut grid, 4, 2, 18);
    add_wall_column(&mut grid, 15, 0, 12);
    grid.set(Node::new(20, 10), TileKind::Wall);

    assert_eq!(prebuild(&grid), prebuild(&grid));
}

/// Every floor pair of a doorway-only layout, hierarchical vs whole-grid A*.
fn assert_all_pairs_within_one_step(grid: &DungeonGrid) {
    let graph = prebuild(grid);
    let floors: Vec<Node> = grid.bounds().iter().filter(|n| grid.is_walkable(*n)).collect();

    for &start in &floors {
        for &goal in &floors {
            let result = find_path(&graph, grid, start.to_position(), goal.to_position());
            match direct_steps(grid, start, goal) {
                None => assert!(result.is_empty(), "{:?} -> {:?} should be unreachable", start, goal),
                Some(direct) => {
                    let steps = result.step_count() as u32;
                    assert!(
                        steps >= direct && steps <= direct + 1,
                        "{:?} -> {:?}: {} steps, direct {}",
                        start,
                        goal,
                        steps,
                        direct
                    );
                }
            }
        }
    }
}

#[test]
fn test_doorway_layouts_stay_within_one_step() {
    let three_doors = DungeonGrid::from_ascii(
        "\
.........#..........
....................
.........#..........
.........#..........
.........#..........
....................
.........#..........
.........#..........
....................
.........#..........",
    )
    .unwrap();
    assert_all_pairs_within_one_step(&three_doors);

    let baffles = DungeonGrid::from_ascii(
        "\
.........#..........
.........#..........
....................
.........#..........
.........#.#########
########.#..........
.........#..........
....................
.........#..........
.........#..........",
    )
    .unwrap();
    assert_all_pairs_within_one_step(&baffles);
}

/// Rows 0-5 open across x=9 (portal 0), plus a doorway at row 8 (portal 1).
fn long_opening_grid() -> DungeonGrid {
    let mut grid = open_grid(20, 10);
    add_wall_column(&mut grid, 9, 6, 8);
    grid.set(Node::new(9, 9), TileKind::Wall);
    grid
}

#[test]
fn test_endpoint_costs_match_descent_lengths() {
    let grid = long_opening_grid();
    let graph = prebuild(&grid);
    assert_eq!(graph.portals.len(), 2);

    let start = Node::new(1, 5);
    let goal = Node::new(14, 6);
    let overlay = QueryOverlay::new(&graph, &grid, start, goal).unwrap();
    let from_sector = graph.sector(SectorCoord::new(0, 0)).unwrap();

    // Nearest span tiles: (9,5) for the opening, (9,8) for the doorway.
    let costs: Vec<(usize, u32)> = overlay.from_portal.connections.iter().map(|c| (c.target, c.cost)).collect();
    assert_eq!(costs, vec![(0, 8), (1, 11)]);
    for conn in &overlay.from_portal.connections {
        let mut walked = Vec::new();
        from_sector.get_flow_field(conn.target).unwrap().descend(start, &mut walked);
        assert_eq!(walked.len() as u32, conn.cost);
    }

    // From (10,5) and (10,8) respectively.
    let incoming: Vec<(usize, u32)> = overlay.incoming.iter().map(|(source, c)| (*source, c.cost)).collect();
    assert_eq!(incoming, vec![(0, 5), (1, 6)]);
}

#[test]
fn test_long_opening_beats_far_doorway() {
    let grid = long_opening_grid();
    let graph = prebuild(&grid);

    // Via the opening: 8 to (9,5), then 6 to the goal. The doorway costs 11 + 7.
    let result = find_path(&graph, &grid, pos(1.0, 5.0), pos(14.0, 6.0));

    assert_eq!(result.portal_trace, vec![2, 0, 3]);
    assert_eq!(result.step_count(), 14);
    assert_eq!(Some(14), direct_steps(&grid, Node::new(1, 5), Node::new(14, 6)));
    assert_valid_path(&grid, &result, Node::new(14, 6));
}
