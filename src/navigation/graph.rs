//! Navigation graph loaded from a JSON floor-plan map.
//!
//! The map author lists named waypoints with 2D positions and a per-node
//! adjacency of weighted edges. Adjacency is exposed exactly as authored:
//! the graph does not symmetrize edges; if a corridor is walkable both ways
//! the map must say so in both nodes.
//!
//! Loads are all-or-nothing. A duplicate id, a neighbor reference to a
//! missing node, or a negative edge cost fails the whole load.

use crate::core::types::Point2D;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// One waypoint of the floor plan.
#[derive(Debug, Clone)]
pub struct GraphNode {
    pub id: String,
    /// Human-readable name, "Unknown" when the map omits it.
    pub name: String,
    /// Audio cue played on arrival; empty = generic checkpoint beep.
    pub audio_cue: String,
    pub position: Point2D,
    /// Neighbor node id -> edge cost (non-negative).
    pub neighbors: HashMap<String, f32>,
}

#[derive(Deserialize)]
struct MapFile {
    nodes: Vec<RawNode>,
}

#[derive(Deserialize)]
struct RawNode {
    id: String,
    #[serde(default = "default_name")]
    name: String,
    #[serde(default)]
    audio: String,
    x: f32,
    y: f32,
    #[serde(default)]
    neighbors: HashMap<String, f32>,
}

fn default_name() -> String {
    "Unknown".to_string()
}

/// Immutable id -> node map over the floor plan.
#[derive(Debug, Default)]
pub struct NavigationGraph {
    nodes: HashMap<String, GraphNode>,
}

impl NavigationGraph {
    /// Load a graph from a JSON map file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .map_err(|e| Error::Map(format!("Failed to read map: {}", e)))?;
        Self::from_json_str(&content)
    }

    /// Parse and validate a graph from a JSON string.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let file: MapFile = serde_json::from_str(content)
            .map_err(|e| Error::Map(format!("Failed to parse map: {}", e)))?;

        let mut nodes: HashMap<String, GraphNode> = HashMap::with_capacity(file.nodes.len());
        for raw in file.nodes {
            let node = GraphNode {
                id: raw.id.clone(),
                name: raw.name,
                audio_cue: raw.audio,
                position: Point2D::new(raw.x, raw.y),
                neighbors: raw.neighbors,
            };
            if nodes.insert(raw.id.clone(), node).is_some() {
                return Err(Error::Map(format!("Duplicate node id: {}", raw.id)));
            }
        }

        // Every edge must point at a real node and carry a sane cost
        for node in nodes.values() {
            for (neighbor_id, cost) in &node.neighbors {
                if !nodes.contains_key(neighbor_id) {
                    return Err(Error::Map(format!(
                        "Node {} references missing neighbor {}",
                        node.id, neighbor_id
                    )));
                }
                if *cost < 0.0 {
                    return Err(Error::Map(format!(
                        "Negative edge cost {} on {} -> {}",
                        cost, node.id, neighbor_id
                    )));
                }
            }
        }

        log::info!("[graph] Loaded {} nodes", nodes.len());
        Ok(Self { nodes })
    }

    pub fn get(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Sorted node ids; the stable order backs destination cycling.
    pub fn sorted_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.nodes.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Straight-line distance between two nodes, `None` if either id is
    /// missing.
    pub fn euclidean(&self, id_a: &str, id_b: &str) -> Option<f32> {
        let a = self.nodes.get(id_a)?;
        let b = self.nodes.get(id_b)?;
        Some(a.position.distance(&b.position))
    }

    /// Node nearest to a point (linear scan). Distance ties break toward
    /// the smaller id so the result is deterministic.
    pub fn nearest(&self, point: Point2D) -> Option<&GraphNode> {
        let mut best: Option<(&GraphNode, f32)> = None;
        for node in self.nodes.values() {
            let distance = node.position.distance(&point);
            best = match best {
                None => Some((node, distance)),
                Some((best_node, best_distance)) => {
                    if distance < best_distance
                        || (distance == best_distance && node.id < best_node.id)
                    {
                        Some((node, distance))
                    } else {
                        Some((best_node, best_distance))
                    }
                }
            };
        }
        best.map(|(node, _)| node)
    }
}
