//! A* shortest path over the navigation graph.
//!
//! Straight-line distance to the target is the heuristic; it is admissible
//! as long as edge costs are at least the Euclidean distance between their
//! endpoints, which holds for any map measured in meters.

use crate::navigation::graph::NavigationGraph;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// Open-set entry ordered for a min-heap on f = g + h.
#[derive(Clone)]
struct OpenNode {
    id: String,
    f_score: f32,
}

impl Eq for OpenNode {}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior; equal scores break on id
        // so exploration order is deterministic
        other
            .f_score
            .partial_cmp(&self.f_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find the cheapest node sequence from `start` to `target`.
///
/// Returns an empty vector when either endpoint is missing or no route
/// exists. `start == target` yields the single-element path.
pub fn find_path(graph: &NavigationGraph, start: &str, target: &str) -> Vec<String> {
    if graph.get(start).is_none() {
        log::error!("[pathfinder] Start node '{}' not found", start);
        return Vec::new();
    }
    if graph.get(target).is_none() {
        log::error!("[pathfinder] Target node '{}' not found", target);
        return Vec::new();
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: HashMap<String, String> = HashMap::new();
    let mut g_score: HashMap<String, f32> = HashMap::new();

    g_score.insert(start.to_string(), 0.0);
    open_set.push(OpenNode {
        id: start.to_string(),
        // Heuristic only; both endpoints were just checked
        f_score: graph.euclidean(start, target).unwrap_or(0.0),
    });

    while let Some(current) = open_set.pop() {
        if current.id == target {
            return reconstruct_path(&came_from, start, target);
        }

        let current_g = *g_score.get(&current.id).unwrap_or(&f32::INFINITY);

        let node = match graph.get(&current.id) {
            Some(node) => node,
            None => continue,
        };

        for (neighbor_id, edge_cost) in &node.neighbors {
            let tentative_g = current_g + edge_cost;

            if tentative_g < *g_score.get(neighbor_id).unwrap_or(&f32::INFINITY) {
                came_from.insert(neighbor_id.clone(), current.id.clone());
                g_score.insert(neighbor_id.clone(), tentative_g);

                let h = graph.euclidean(neighbor_id, target).unwrap_or(0.0);
                open_set.push(OpenNode {
                    id: neighbor_id.clone(),
                    f_score: tentative_g + h,
                });
            }
        }
    }

    log::warn!("[pathfinder] No path from {} to {}", start, target);
    Vec::new()
}

fn reconstruct_path(
    came_from: &HashMap<String, String>,
    start: &str,
    target: &str,
) -> Vec<String> {
    let mut path = vec![target.to_string()];
    let mut current = target;

    while current != start {
        match came_from.get(current) {
            Some(previous) => {
                path.push(previous.clone());
                current = previous;
            }
            None => break,
        }
    }

    path.reverse();
    path
}
