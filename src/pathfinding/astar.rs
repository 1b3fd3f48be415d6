use bevy::prelude::*;
use fixedbitset::FixedBitSet;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use crate::structures::{DungeonGrid, Node, TileRect};

/// Open-set entry ordered so that `BinaryHeap` pops the lowest f-score.
#[derive(Clone, Copy, Debug)]
pub(super) struct State<T> {
    pub f_score: f32,
    pub item: T,
}

impl<T> PartialEq for State<T> {
    fn eq(&self, other: &Self) -> bool {
        self.f_score.total_cmp(&other.f_score) == Ordering::Equal
    }
}

impl<T> Eq for State<T> {}

impl<T> PartialOrd for State<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for State<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.f_score.total_cmp(&self.f_score)
    }
}

/// Straight-line distance. Admissible for unit-cost 4-connected movement.
pub(super) fn heuristic(a: Vec2, b: Vec2) -> f32 {
    a.distance(b)
}

fn reconstruct_path(came_from: &[Option<usize>], rect: &TileRect, goal_idx: usize) -> Vec<Node> {
    let mut path = vec![rect.node_at(goal_idx)];
    let mut current = goal_idx;
    while let Some(prev) = came_from[current] {
        current = prev;
        path.push(rect.node_at(current));
    }
    path.reverse();
    path
}

/// Shortest 4-connected tile path from `start` to `goal`, restricted to
/// `bounds` (inclusive min, exclusive max).
///
/// Returns both endpoints. The result is empty when the start is outside
/// the grid or the bounds, is not floor, or the goal cannot be reached.
pub fn find_path_astar_local(grid: &DungeonGrid, start: Node, goal: Node, bounds: TileRect) -> Vec<Node> {
    let rect = bounds.intersect(&grid.bounds());
    let Some(start_idx) = rect.local_index(start) else {
        return Vec::new();
    };
    if !grid.is_walkable(start) {
        return Vec::new();
    }
    if start == goal {
        return vec![start];
    }
    let Some(goal_idx) = rect.local_index(goal) else {
        return Vec::new();
    };
    if !grid.is_walkable(goal) {
        return Vec::new();
    }

    let size = rect.area();
    let goal_pos = goal.to_position();
    let mut g_score = vec![u32::MAX; size];
    let mut came_from: Vec<Option<usize>> = vec![None; size];
    let mut closed = FixedBitSet::with_capacity(size);
    let mut open_set = BinaryHeap::new();

    g_score[start_idx] = 0;
    open_set.push(State { f_score: heuristic(start.to_position(), goal_pos), item: start_idx });

    while let Some(State { item: current_idx, .. }) = open_set.pop() {
        if current_idx == goal_idx {
            return reconstruct_path(&came_from, &rect, goal_idx);
        }
        if closed.put(current_idx) {
            continue;
        }

        let current = rect.node_at(current_idx);
        let tentative_g = g_score[current_idx] + 1;
        for neighbor in current.neighbors() {
            let Some(n_idx) = rect.local_index(neighbor) else {
                continue;
            };
            if closed.contains(n_idx) || !grid.is_walkable(neighbor) {
                continue;
            }
            if tentative_g < g_score[n_idx] {
                g_score[n_idx] = tentative_g;
                came_from[n_idx] = Some(current_idx);
                let f_score = tentative_g as f32 + heuristic(neighbor.to_position(), goal_pos);
                open_set.push(State { f_score, item: n_idx });
            }
        }
    }

    Vec::new()
}

/// Step count of the shortest path, or `None` if there is none.
pub fn path_steps(grid: &DungeonGrid, start: Node, goal: Node, bounds: TileRect) -> Option<u32> {
    let path = find_path_astar_local(grid, start, goal, bounds);
    if path.is_empty() {
        None
    } else {
        Some((path.len() - 1) as u32)
    }
}
