//! Fixed-rate control loop.
//!
//! One thread owns every piece of mutable state: the PDR accumulators, the
//! EKF, the BLE correction timer, and the navigation session. Each tick
//! runs sensors -> key handling -> PDR predict -> (optionally) BLE update
//! -> guidance, then sleeps the remainder of the period. The only long
//! block is the bounded BLE scan, at most once per correction interval.

use crate::config::Config;
use crate::core::types::KeyPress;
use crate::error::Result;
use crate::hardware::HardwarePort;
use crate::navigation::announcer::Announcer;
use crate::navigation::graph::NavigationGraph;
use crate::navigation::pathfinder;
use crate::positioning::{Ekf, FingerprintLocalizer, Pdr};
use std::time::{Duration, Instant};

/// The 50 Hz orchestrator that owns the whole pipeline.
pub struct Engine {
    config: Config,
    hardware: Box<dyn HardwarePort>,
    graph: NavigationGraph,
    localizer: FingerprintLocalizer,

    pdr: Pdr,
    ekf: Ekf,
    announcer: Announcer,

    // Navigation session
    path: Vec<String>,
    is_navigating: bool,

    /// Destination choices, cycled by the column-4 keys.
    selectable: Vec<String>,
    selection: usize,

    /// Seconds accumulated toward the next periodic BLE correction.
    ble_timer: f32,
    last_tick: Instant,
}

impl Engine {
    pub fn new(
        config: Config,
        hardware: Box<dyn HardwarePort>,
        graph: NavigationGraph,
        localizer: FingerprintLocalizer,
    ) -> Self {
        let mut ekf = Ekf::new(&config.ekf);
        ekf.initialize(
            config.navigation.start_x,
            config.navigation.start_y,
            config.navigation.start_theta,
        );

        // The configured destination is the initial selection; fall back to
        // the first node if the map does not contain it.
        let selectable = graph.sorted_ids();
        let selection = selectable
            .iter()
            .position(|id| *id == config.navigation.default_destination)
            .unwrap_or(0);

        let pdr = Pdr::new(config.pdr.clone(), config.hardware.gyro_sign);
        let announcer = Announcer::new(&config.navigation);

        Self {
            hardware,
            graph,
            localizer,
            pdr,
            ekf,
            announcer,
            path: Vec::new(),
            is_navigating: false,
            selectable,
            selection,
            ble_timer: 0.0,
            config,
            last_tick: Instant::now(),
        }
    }

    /// Run until the power switch turns off.
    pub fn run(&mut self) -> Result<()> {
        let tick_period = Duration::from_millis(self.config.engine.tick_ms);
        log::info!(
            "[engine] Running at {} ms/tick, BLE correction every {:.1} s",
            self.config.engine.tick_ms,
            self.config.engine.ble_scan_interval_secs
        );

        self.last_tick = Instant::now();

        while self.hardware.power_on() {
            let tick_start = Instant::now();
            let dt = tick_start.duration_since(self.last_tick).as_secs_f32();
            self.last_tick = tick_start;

            let imu = self.hardware.read_imu();
            let key = self.hardware.poll_key();

            if key != KeyPress::None {
                self.handle_key(key);
            }

            // Positioning pipeline: stride prediction every tick
            self.pdr.process_imu(&imu, dt);
            let stride = self.pdr.drain_update();
            self.ekf.predict(&stride);

            // Periodic BLE correction. The scan may stall this tick for up
            // to a second; the next tick's dt absorbs it. A WhereAmI snap
            // does not reset this timer.
            self.ble_timer += dt;
            if self.ble_timer > self.config.engine.ble_scan_interval_secs {
                let scan = self.hardware.scan_ble();
                if scan.is_empty() {
                    log::debug!("[engine] BLE scan empty, skipping correction");
                } else {
                    let fix = self.localizer.find_closest_position(&scan);
                    self.ekf.update(fix);
                }
                self.ble_timer = 0.0;
            }

            if self.is_navigating {
                let pose = self.ekf.pose();
                self.announcer
                    .update(&pose, &self.path, &self.graph, self.hardware.as_mut());
            }

            let elapsed = tick_start.elapsed();
            if elapsed < tick_period {
                std::thread::sleep(tick_period - elapsed);
            }
        }

        log::info!("[engine] Power switch off, shutting down");
        Ok(())
    }

    fn handle_key(&mut self, key: KeyPress) {
        match key {
            KeyPress::WhereAmI => self.snap_to_ble_fix(),
            KeyPress::StartNavigation => self.start_navigation(),
            KeyPress::ColumnUp(4) => self.cycle_selection(1),
            KeyPress::ColumnDown(4) => self.cycle_selection(-1),
            KeyPress::CurrentSelection => self.announce_selection(),
            // Remaining keypad columns are reserved
            other => log::debug!("[engine] Ignoring key {:?}", other),
        }
    }

    /// Immediate BLE scan and EKF snap, on user request.
    fn snap_to_ble_fix(&mut self) {
        log::info!("[engine] Key: where am I?");
        let scan = self.hardware.scan_ble();
        let fix = self.localizer.find_closest_position(&scan);
        self.ekf.update(fix);
        self.hardware.play_audio("location_update");
    }

    fn start_navigation(&mut self) {
        let destination = match self.selectable.get(self.selection) {
            Some(id) => id.clone(),
            None => {
                log::error!("[engine] No destinations available");
                self.hardware.play_audio("error_no_path");
                return;
            }
        };

        // Route from the graph node nearest to the current estimate
        let pose = self.ekf.pose();
        let start_id = match self.graph.nearest(pose.position()) {
            Some(node) => node.id.clone(),
            None => {
                log::error!("[engine] Graph is empty, cannot navigate");
                self.hardware.play_audio("error_no_path");
                return;
            }
        };

        log::info!(
            "[engine] Key: start navigation {} -> {}",
            start_id,
            destination
        );

        let path = pathfinder::find_path(&self.graph, &start_id, &destination);
        if path.is_empty() {
            self.hardware.play_audio("error_no_path");
            return;
        }

        self.path = path;
        self.is_navigating = true;
        self.announcer.reset();
        self.hardware.play_audio("navigation_started");
    }

    fn cycle_selection(&mut self, direction: i32) {
        if self.selectable.is_empty() {
            return;
        }
        let count = self.selectable.len() as i32;
        let next = (self.selection as i32 + direction).rem_euclid(count);
        self.selection = next as usize;
        log::info!(
            "[engine] Destination selection: {}",
            self.selectable[self.selection]
        );
    }

    /// Audible confirmation of the currently selected destination.
    fn announce_selection(&mut self) {
        let cue = self
            .selectable
            .get(self.selection)
            .and_then(|id| self.graph.get(id))
            .map(|node| node.audio_cue.clone())
            .filter(|cue| !cue.is_empty())
            .unwrap_or_else(|| "beep_checkpoint".to_string());
        self.hardware.play_audio(&cue);
    }

    /// Current pose estimate, for tests and diagnostics.
    pub fn pose(&self) -> crate::core::types::Pose2D {
        self.ekf.pose()
    }

    /// Active path, empty when not navigating.
    pub fn path(&self) -> &[String] {
        &self.path
    }
}
