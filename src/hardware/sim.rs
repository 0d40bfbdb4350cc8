//! Simulated hardware backend.
//!
//! Generates a walking motion profile good enough to exercise the real step
//! detector, replays a scripted key sequence, and answers BLE scans with a
//! fixed advertiser set. Runs the whole engine without any device attached.
//!
//! The power switch is an atomic flag cleared by Ctrl-C, or automatically
//! after `max_ticks` reads (handy for tests and batch runs).

use super::HardwarePort;
use crate::config::SimConfig;
use crate::core::types::{BleReading, ImuSample, KeyPress};
use crate::error::Result;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::collections::VecDeque;
use std::f32::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Gravity baseline of the acceleration waveform (m/s²).
const GRAVITY: f32 = 9.81;

/// Simulated sample spacing of the walking waveform. The waveform advances
/// one nominal tick per `read_imu` call so step cadence is stable even when
/// tests run the engine faster than real time.
const SIM_SAMPLE_DT: f32 = 0.02;

/// Scripted hardware backend.
pub struct SimulatedHardware {
    config: SimConfig,
    rng: SmallRng,
    /// Ticks elapsed, advanced once per `read_imu`.
    tick: u64,
    /// Scripted key events, sorted by tick and consumed once each.
    keys: VecDeque<(u64, KeyPress)>,
    /// Every cue handed to `play_audio`, for test inspection.
    cue_log: Arc<Mutex<Vec<String>>>,
    power: Arc<AtomicBool>,
}

impl SimulatedHardware {
    pub fn new(config: &SimConfig) -> Self {
        let mut keys: Vec<(u64, KeyPress)> = config
            .keys
            .iter()
            .filter_map(|event| match parse_key(&event.key) {
                Some(key) => Some((event.tick, key)),
                None => {
                    log::warn!("[sim] Ignoring unknown key name: {}", event.key);
                    None
                }
            })
            .collect();
        keys.sort_by_key(|(tick, _)| *tick);

        let power = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&power);
        // Only the first simulator in a process gets the handler; later ones
        // rely on max_ticks.
        if ctrlc::set_handler(move || {
            log::info!("[sim] Received shutdown signal, power switch off");
            flag.store(false, Ordering::Relaxed);
        })
        .is_err()
        {
            log::debug!("[sim] Ctrl-C handler already installed");
        }

        // Seed 0 asks for fresh entropy; anything else replays exactly.
        let rng = match config.seed {
            0 => SmallRng::from_entropy(),
            seed => SmallRng::seed_from_u64(seed),
        };

        Self {
            config: config.clone(),
            rng,
            tick: 0,
            keys: keys.into(),
            cue_log: Arc::new(Mutex::new(Vec::new())),
            power,
        }
    }

    /// Handle onto the audio cue log, for tests and demos.
    pub fn cue_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.cue_log)
    }
}

impl HardwarePort for SimulatedHardware {
    fn initialize(&mut self) -> Result<()> {
        log::info!(
            "[sim] Simulated hardware ready (seed={}, {} scripted keys)",
            self.config.seed,
            self.keys.len()
        );
        Ok(())
    }

    fn read_imu(&mut self) -> ImuSample {
        let t = self.tick as f32 * SIM_SAMPLE_DT;
        self.tick += 1;

        // Vertical acceleration swings around gravity at step cadence; the
        // rising-then-falling shape is what the peak detector keys on.
        let phase = 2.0 * PI * self.config.step_frequency_hz * t;
        let accel_sigma = self.config.accel_noise_stddev;
        let gyro_sigma = self.config.gyro_noise_stddev;
        let az = GRAVITY
            + self.config.step_amplitude * phase.sin()
            + jitter(&mut self.rng, accel_sigma);

        ImuSample {
            ax: jitter(&mut self.rng, accel_sigma),
            ay: jitter(&mut self.rng, accel_sigma),
            az,
            gx: jitter(&mut self.rng, gyro_sigma),
            gy: jitter(&mut self.rng, gyro_sigma),
            gz: self.config.turn_rate + jitter(&mut self.rng, gyro_sigma),
        }
    }

    fn scan_ble(&mut self) -> Vec<BleReading> {
        if self.config.scan_latency_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.config.scan_latency_ms));
        }
        let beacons: Vec<BleReading> = self
            .config
            .beacons
            .iter()
            .map(|b| BleReading::new(b.id.clone(), b.rssi))
            .collect();
        log::debug!("[sim] BLE scan complete, {} advertisers", beacons.len());
        beacons
    }

    fn poll_key(&mut self) -> KeyPress {
        if let Some(&(tick, key)) = self.keys.front() {
            if tick < self.tick {
                self.keys.pop_front();
                log::info!("[sim] Scripted key at tick {}: {:?}", tick, key);
                return key;
            }
        }
        KeyPress::None
    }

    fn play_audio(&mut self, cue: &str) {
        log::info!("[sim] Playing audio cue: '{}.wav'", cue);
        if let Ok(mut cues) = self.cue_log.lock() {
            cues.push(cue.to_string());
        }
    }

    fn power_on(&self) -> bool {
        if self.config.max_ticks > 0 && self.tick >= self.config.max_ticks {
            return false;
        }
        self.power.load(Ordering::Relaxed)
    }
}

/// One draw of Gaussian channel noise.
///
/// A zero sigma collapses the distribution to its mean, so noiseless test
/// configs stay bit-exact; a malformed sigma (negative, NaN) is treated as
/// silence rather than poisoning the sample stream.
fn jitter(rng: &mut SmallRng, sigma: f32) -> f32 {
    match Normal::new(0.0, sigma) {
        Ok(dist) => dist.sample(rng),
        Err(_) => 0.0,
    }
}

/// Parse a scripted key name. See [`crate::config::SimKeyEvent`] for the
/// vocabulary.
fn parse_key(name: &str) -> Option<KeyPress> {
    match name {
        "where_am_i" => Some(KeyPress::WhereAmI),
        "start_navigation" => Some(KeyPress::StartNavigation),
        "current_selection" => Some(KeyPress::CurrentSelection),
        "column_1_up" => Some(KeyPress::ColumnUp(1)),
        "column_2_up" => Some(KeyPress::ColumnUp(2)),
        "column_3_up" => Some(KeyPress::ColumnUp(3)),
        "column_4_up" => Some(KeyPress::ColumnUp(4)),
        "column_1_down" => Some(KeyPress::ColumnDown(1)),
        "column_2_down" => Some(KeyPress::ColumnDown(2)),
        "column_3_down" => Some(KeyPress::ColumnDown(3)),
        "column_4_down" => Some(KeyPress::ColumnDown(4)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SimConfig, SimKeyEvent};
    use crate::positioning::pdr::Pdr;

    fn quiet_config() -> SimConfig {
        SimConfig {
            scan_latency_ms: 0,
            ..SimConfig::default()
        }
    }

    #[test]
    fn test_zero_sigma_is_exact() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..10 {
            assert_eq!(jitter(&mut rng, 0.0), 0.0);
        }
        // Garbage sigmas degrade to silence instead of NaN samples
        assert_eq!(jitter(&mut rng, -1.0), 0.0);
    }

    #[test]
    fn test_deterministic_imu_stream() {
        let config = quiet_config();
        let mut a = SimulatedHardware::new(&config);
        let mut b = SimulatedHardware::new(&config);

        for _ in 0..200 {
            let sa = a.read_imu();
            let sb = b.read_imu();
            assert_eq!(sa.az, sb.az);
            assert_eq!(sa.gz, sb.gz);
        }
    }

    #[test]
    fn test_walking_profile_produces_steps() {
        let config = quiet_config();
        let mut hw = SimulatedHardware::new(&config);
        let mut pdr = Pdr::new(crate::config::PdrConfig::default(), 1.0);

        // Three seconds of simulated walking at 1.8 Hz
        let mut steps = 0;
        for _ in 0..150 {
            let sample = hw.read_imu();
            pdr.process_imu(&sample, SIM_SAMPLE_DT);
            let update = pdr.drain_update();
            if update.step_detected {
                steps += 1;
            }
        }
        assert!(steps >= 3, "expected at least 3 steps, got {}", steps);
    }

    #[test]
    fn test_scripted_keys_fire_once() {
        let mut config = quiet_config();
        config.keys = vec![SimKeyEvent {
            tick: 2,
            key: "start_navigation".to_string(),
        }];
        let mut hw = SimulatedHardware::new(&config);

        // Before the scripted tick: nothing
        hw.read_imu();
        assert_eq!(hw.poll_key(), KeyPress::None);

        // At the scripted tick: the key, exactly once
        hw.read_imu();
        hw.read_imu();
        assert_eq!(hw.poll_key(), KeyPress::StartNavigation);
        assert_eq!(hw.poll_key(), KeyPress::None);
    }

    #[test]
    fn test_power_off_after_max_ticks() {
        let mut config = quiet_config();
        config.max_ticks = 3;
        let mut hw = SimulatedHardware::new(&config);

        assert!(hw.power_on());
        for _ in 0..3 {
            hw.read_imu();
        }
        assert!(!hw.power_on());
    }

    #[test]
    fn test_scan_returns_configured_beacons() {
        let config = quiet_config();
        let mut hw = SimulatedHardware::new(&config);
        let scan = hw.scan_ble();
        assert_eq!(scan.len(), 3);
        assert_eq!(scan[0].beacon_id, "BEACON_ID_1");
        assert_eq!(scan[0].rssi, -55);
    }
}
