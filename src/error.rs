//! Error types for TIRE
//!
//! Initialization failures (hardware bring-up, map loads) are fatal and
//! propagate out of `main`. Everything that can go wrong after startup is
//! recovered at the component boundary and logged; the control loop never
//! crashes on a runtime error.

use thiserror::Error;

/// Errors that can occur in TIRE
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Map error: {0}")]
    Map(String),

    #[error("Hardware error: {0}")]
    Hardware(String),

    #[error("Unknown hardware backend: {0}")]
    UnknownBackend(String),
}

pub type Result<T> = std::result::Result<T, Error>;
