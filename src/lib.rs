//! TIRE - Turn-by-turn Indoor Routing Engine
//!
//! Real-time positioning and spoken guidance for a GPS-less wearable:
//! pedestrian dead reckoning fused with BLE fingerprint fixes through an
//! EKF, A* routing on a floor-plan graph, and a waypoint announcer, all
//! orchestrated by a single 50 Hz control loop over a swappable hardware
//! port.
//!
//! ## Features
//!
//! - `rpi`: Raspberry Pi hardware backend (I2C IMU, GPIO keypad, hcitool
//!   BLE scan). Without it only the simulated backend is available.

pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod hardware;
pub mod navigation;
pub mod positioning;

// Re-export commonly used types
pub use config::Config;
pub use engine::Engine;
pub use error::{Error, Result};
