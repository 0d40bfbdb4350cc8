//! Waypoint-tracking guidance state machine.
//!
//! Walks an active path waypoint by waypoint. Inside the reach radius the
//! waypoint's cue plays and the target advances; otherwise a turn cue is
//! spoken whenever the heading error exceeds the threshold, rate-limited
//! by a cooldown. Silence means "keep straight".
//!
//! Heading errors are CCW-positive: with theta measured CCW from +x, a
//! positive error rotates left. The `gyro_sign` config knob aligns an
//! inverted IMU mount to this convention upstream.

use crate::config::NavigationConfig;
use crate::core::types::Pose2D;
use crate::hardware::HardwarePort;
use crate::navigation::graph::NavigationGraph;
use std::time::Instant;

/// Sentinel returned when no guidance applies (no path, arrived, or a
/// lookup failed).
pub const NO_TARGET: i32 = -1;

/// Spoken-guidance progress tracker for one navigation session.
pub struct Announcer {
    /// Index of the waypoint currently steered toward. The path starts at
    /// the user's position, so tracking begins at 1.
    next_target_index: usize,
    destination_reached: bool,
    /// Last spoken turn cue; `None` lifts the cooldown so the next tick
    /// may speak immediately.
    last_announcement: Option<Instant>,

    waypoint_radius: f32,
    cooldown_secs: f32,
    turn_threshold: f32,
}

impl Announcer {
    pub fn new(config: &NavigationConfig) -> Self {
        Self {
            next_target_index: 1,
            destination_reached: false,
            last_announcement: None,
            waypoint_radius: config.waypoint_radius,
            cooldown_secs: config.announcement_cooldown_secs,
            turn_threshold: config.turn_threshold,
        }
    }

    /// Start tracking a fresh path.
    pub fn reset(&mut self) {
        self.next_target_index = 1;
        self.destination_reached = false;
        self.last_announcement = None;
    }

    pub fn destination_reached(&self) -> bool {
        self.destination_reached
    }

    /// Advance the guidance state machine one tick.
    ///
    /// Returns the index of the waypoint now being tracked, or [`NO_TARGET`]
    /// when there is nothing to track.
    pub fn update(
        &mut self,
        pose: &Pose2D,
        path: &[String],
        graph: &NavigationGraph,
        hw: &mut dyn HardwarePort,
    ) -> i32 {
        if path.is_empty() || self.destination_reached {
            return NO_TARGET;
        }

        // Ran out of waypoints: we have arrived
        if self.next_target_index >= path.len() {
            hw.play_audio("destination_reached");
            self.destination_reached = true;
            return NO_TARGET;
        }

        let target_id = &path[self.next_target_index];
        let target = match graph.get(target_id) {
            Some(node) => node,
            None => return NO_TARGET,
        };

        let dx = target.position.x - pose.x;
        let dy = target.position.y - pose.y;
        let distance = (dx * dx + dy * dy).sqrt();

        if distance < self.waypoint_radius {
            log::info!("[announcer] Reached waypoint {}", target_id);
            if target.audio_cue.is_empty() {
                hw.play_audio("beep_checkpoint");
            } else {
                hw.play_audio(&target.audio_cue);
            }

            self.next_target_index += 1;
            // Let the next tick speak for the new target right away
            self.last_announcement = None;
            return self.next_target_index as i32;
        }

        // Rate-limit turn instructions
        if let Some(spoken_at) = self.last_announcement {
            if spoken_at.elapsed().as_secs_f32() < self.cooldown_secs {
                return self.next_target_index as i32;
            }
        }

        let bearing = dy.atan2(dx);
        let error = crate::core::math::angle_diff(pose.theta, bearing);

        if error > self.turn_threshold {
            hw.play_audio("turn_left");
            self.last_announcement = Some(Instant::now());
        } else if error < -self.turn_threshold {
            hw.play_audio("turn_right");
            self.last_announcement = Some(Instant::now());
        }
        // Within the threshold: silence means keep straight

        self.next_target_index as i32
    }
}
