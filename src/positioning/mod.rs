//! Positioning pipeline: dead reckoning, BLE fingerprinting, and fusion.

pub mod ekf;
pub mod fingerprint;
pub mod pdr;

pub use ekf::Ekf;
pub use fingerprint::FingerprintLocalizer;
pub use pdr::Pdr;
