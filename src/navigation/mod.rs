//! Navigation: floor-plan graph, routing, and spoken guidance.

pub mod announcer;
pub mod graph;
pub mod pathfinder;

pub use announcer::Announcer;
pub use graph::{GraphNode, NavigationGraph};
