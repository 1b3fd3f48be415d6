use fixedbitset::FixedBitSet;
use std::collections::BinaryHeap;
use super::astar::{heuristic, State};
use super::graph::PortalNetwork;
use super::types::PortalConnection;

fn reconstruct_portal_path(prev: &[Option<(usize, PortalConnection)>], to: usize) -> Vec<PortalConnection> {
    let mut hops = Vec::new();
    let mut current = to;
    while let Some((source, conn)) = prev[current] {
        hops.push(conn);
        current = source;
    }
    hops.reverse();
    hops
}

/// Cheapest chain of connections from portal `from` to portal `to`.
///
/// Costs are summed connection costs; the heuristic is the straight-line
/// distance between portal midpoints. Empty if `from == to`, if either id
/// is unknown, or if `to` cannot be reached.
pub fn find_portal_path<N: PortalNetwork>(network: &N, from: usize, to: usize) -> Vec<PortalConnection> {
    let size = network.node_count();
    if from == to || from >= size || to >= size {
        return Vec::new();
    }
    let (Some(from_pos), Some(goal_pos)) = (network.midpoint(from), network.midpoint(to)) else {
        return Vec::new();
    };

    let mut g_score = vec![u64::MAX; size];
    let mut prev: Vec<Option<(usize, PortalConnection)>> = vec![None; size];
    let mut closed = FixedBitSet::with_capacity(size);
    let mut open_set = BinaryHeap::new();

    g_score[from] = 0;
    open_set.push(State { f_score: heuristic(from_pos, goal_pos), item: from });

    while let Some(State { item: current, .. }) = open_set.pop() {
        if current == to {
            return reconstruct_portal_path(&prev, to);
        }
        if closed.put(current) {
            continue;
        }

        for conn in network.connections(current) {
            let next = conn.target;
            if next >= size || closed.contains(next) {
                continue;
            }
            let tentative_g = g_score[current] + conn.cost as u64;
            if tentative_g < g_score[next] {
                g_score[next] = tentative_g;
                prev[next] = Some((current, *conn));
                let h = network.midpoint(next).map_or(0.0, |p| heuristic(p, goal_pos));
                open_set.push(State { f_score: tentative_g as f32 + h, item: next });
            }
        }
    }

    Vec::new()
}
