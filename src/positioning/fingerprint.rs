//! BLE fingerprint localizer.
//!
//! Matches a live RSSI scan against a surveyed radio map with k-nearest
//! neighbors in signal space and returns the centroid of the best matches.
//!
//! The fingerprint distance is Euclidean over the union of beacon ids, with
//! missing entries imputed at -100 dBm ("not observed ≈ very weak"). The
//! imputation keeps the metric meaningful when the live scan and a survey
//! saw different beacon sets.

use crate::core::types::{BleReading, Point2D};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// RSSI assumed for a beacon present in one fingerprint but not the other.
const RSSI_PENALTY: i32 = -100;

/// A surveyed reference point: a known position and the signal strengths
/// recorded there.
#[derive(Debug, Clone, Deserialize)]
pub struct RpFingerprint {
    pub rp_id: String,
    pub position: Point2D,
    /// beacon id -> average RSSI in dBm
    pub signal_strengths: HashMap<String, i32>,
}

#[derive(Deserialize)]
struct RadioMapFile {
    reference_points: Vec<RpFingerprint>,
}

/// k-NN localizer over a radio map.
pub struct FingerprintLocalizer {
    k: usize,
    fingerprints: Vec<RpFingerprint>,
}

impl FingerprintLocalizer {
    /// Create a localizer averaging the `k` nearest reference points.
    /// `k` is clamped up to 1.
    pub fn new(k: usize) -> Self {
        Self {
            k: k.max(1),
            fingerprints: Vec::new(),
        }
    }

    /// Load a radio map from a JSON file, replacing any previous map.
    ///
    /// Format: `{ "reference_points": [ { "rp_id", "position": {x, y},
    /// "signal_strengths": { beacon_id: rssi } } ] }`
    pub fn load_map<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let content = fs::read_to_string(&path)
            .map_err(|e| Error::Map(format!("Failed to read radio map: {}", e)))?;
        self.load_map_str(&content)
    }

    /// Parse a radio map from a JSON string.
    pub fn load_map_str(&mut self, content: &str) -> Result<()> {
        let file: RadioMapFile = serde_json::from_str(content)
            .map_err(|e| Error::Map(format!("Failed to parse radio map: {}", e)))?;
        log::info!(
            "[localizer] Loaded {} reference points",
            file.reference_points.len()
        );
        self.fingerprints = file.reference_points;
        Ok(())
    }

    /// Install the built-in three-point hallway map.
    ///
    /// Used for smoke testing and as the fallback when no radio map file is
    /// configured.
    pub fn load_placeholder_map(&mut self) {
        fn rp(id: &str, y: f32, strengths: [(&str, i32); 3]) -> RpFingerprint {
            RpFingerprint {
                rp_id: id.to_string(),
                position: Point2D::new(0.0, y),
                signal_strengths: strengths
                    .iter()
                    .map(|(beacon, rssi)| (beacon.to_string(), *rssi))
                    .collect(),
            }
        }

        self.fingerprints = vec![
            rp(
                "RP_HALLWAY_START",
                0.0,
                [("BEACON_ID_1", -50), ("BEACON_ID_2", -80), ("BEACON_ID_3", -90)],
            ),
            rp(
                "RP_HALLWAY_MIDDLE",
                5.0,
                [("BEACON_ID_1", -65), ("BEACON_ID_2", -65), ("BEACON_ID_3", -85)],
            ),
            rp(
                "RP_HALLWAY_END",
                10.0,
                [("BEACON_ID_1", -90), ("BEACON_ID_2", -50), ("BEACON_ID_3", -80)],
            ),
        ];
    }

    /// Number of loaded reference points.
    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    /// Position estimate for a live scan: centroid of the `min(k, N)`
    /// reference points nearest in signal space.
    ///
    /// An empty radio map yields the origin (and an error log). An empty
    /// scan is still matched - every live RSSI imputes to the penalty, so
    /// the result degrades gracefully rather than failing. Distance ties
    /// keep the stable sort order, so identical input gives identical
    /// output.
    pub fn find_closest_position(&self, scan: &[BleReading]) -> Point2D {
        if self.fingerprints.is_empty() {
            log::error!("[localizer] Radio map is empty; was load_map called?");
            return Point2D::default();
        }

        let live: HashMap<&str, i32> = scan
            .iter()
            .map(|reading| (reading.beacon_id.as_str(), reading.rssi))
            .collect();

        let mut neighbors: Vec<(f32, Point2D)> = self
            .fingerprints
            .iter()
            .map(|rp| (fingerprint_distance(&live, &rp.signal_strengths), rp.position))
            .collect();

        neighbors.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let count = self.k.min(neighbors.len());
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        for (_, position) in &neighbors[..count] {
            sum_x += position.x;
            sum_y += position.y;
        }

        Point2D::new(sum_x / count as f32, sum_y / count as f32)
    }
}

/// Euclidean distance between two RSSI fingerprints over the union of
/// their beacon ids.
fn fingerprint_distance(live: &HashMap<&str, i32>, stored: &HashMap<String, i32>) -> f32 {
    let mut beacon_ids: HashSet<&str> = live.keys().copied().collect();
    beacon_ids.extend(stored.keys().map(|id| id.as_str()));

    let mut sum_of_squares = 0.0f32;
    for id in beacon_ids {
        let rssi_live = live.get(id).copied().unwrap_or(RSSI_PENALTY);
        let rssi_stored = stored.get(id).copied().unwrap_or(RSSI_PENALTY);
        let diff = (rssi_live - rssi_stored) as f32;
        sum_of_squares += diff * diff;
    }

    sum_of_squares.sqrt()
}
